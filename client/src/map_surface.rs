use std::collections::HashMap;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use osiris_shared::{Coordinate, PointOfInterest};
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::config::{
    self, FLY_DURATION_MS, INITIAL_CENTER, INITIAL_ZOOM, MAP_STYLE, SHEET_COLLAPSED_PADDING_PX,
    SHEET_TRANSITION_MS, ZOOM_ANIMATION_MS,
};
use crate::layers::{
    LayerKind, LayerManifest, LayerVisibility, StyleLayer, TERRAIN_EXAGGERATION,
    TERRAIN_SOURCE_ID, TERRAIN_SOURCE_URL, resolve_layer_ids,
};
use crate::mapbox::{
    DurationOptions, FlyToOptions, MapOptions, MapboxMap, Marker, Padding, call_method,
    has_method, linear_ease_options, marker_options, renderer_available, to_js,
};
use crate::roster::DisplayTile;
use crate::rotation::{GlobeRotation, RotationStep, wrap_longitude};

/// Bottom camera padding for the sheet state. The collapsed handle gets no padding.
pub(crate) fn sheet_padding(expanded: bool) -> f64 {
    if expanded {
        SHEET_COLLAPSED_PADDING_PX
    } else {
        0.0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DemSource {
    #[serde(rename = "type")]
    kind: &'static str,
    url: &'static str,
    tile_size: u32,
    maxzoom: f64,
}

#[derive(Serialize)]
struct TerrainSpec {
    source: &'static str,
    exaggeration: f64,
}

struct MarkerBinding {
    marker: Marker,
    _on_click: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

impl MarkerBinding {
    fn remove(self) {
        self.marker.remove();
    }
}

#[derive(Default)]
struct MapInner {
    map: Option<MapboxMap>,
    self_marker: Option<MarkerBinding>,
    visitor_markers: Vec<MarkerBinding>,
    poi_markers: Vec<MarkerBinding>,
    rotation: GlobeRotation,
    manifest: LayerManifest,
    layer_ids: HashMap<LayerKind, Vec<String>>,
    style_ready: bool,
    handlers: Vec<Closure<dyn FnMut(JsValue)>>,
}

/// Owns the map instance and everything drawn on it. Created once per page and
/// shared through context.
#[derive(Clone, Copy)]
pub(crate) struct MapController {
    inner: StoredValue<MapInner, LocalStorage>,
    pub loaded: RwSignal<bool>,
    pub rotation_engaged: RwSignal<bool>,
    pub sheet_expanded: RwSignal<bool>,
    pub layers: RwSignal<LayerVisibility>,
    pub selected_visitor: RwSignal<Option<DisplayTile>>,
}

fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

fn bind(
    map: &MapboxMap,
    event: &str,
    handler: impl FnMut(JsValue) + 'static,
) -> Closure<dyn FnMut(JsValue)> {
    let closure = Closure::<dyn FnMut(JsValue)>::new(handler);
    map.on(event, closure.as_ref().unchecked_ref());
    closure
}

fn create_element(tag: &str, class: &str) -> Option<web_sys::Element> {
    let element = web_sys::window()?.document()?.create_element(tag).ok()?;
    element.set_class_name(class);
    Some(element)
}

fn read_style_layers(map: &MapboxMap) -> Option<Vec<StyleLayer>> {
    let style = call_method(map, "getStyle", &[])?;
    let layers = js_sys::Reflect::get(&style, &JsValue::from_str("layers")).ok()?;
    serde_wasm_bindgen::from_value(layers).ok()
}

impl MapController {
    pub(crate) fn new(layers: LayerVisibility) -> Self {
        Self {
            inner: StoredValue::new_local(MapInner::default()),
            loaded: RwSignal::new(false),
            rotation_engaged: RwSignal::new(false),
            sheet_expanded: RwSignal::new(false),
            layers: RwSignal::new(layers),
            selected_visitor: RwSignal::new(None),
        }
    }

    fn map(&self) -> Option<MapboxMap> {
        self.inner.try_with_value(|inner| inner.map.clone()).flatten()
    }

    /// Create the globe inside `container`. A second call is a no-op.
    pub(crate) fn mount(&self, container: &web_sys::HtmlElement, token: &str) -> Result<(), String> {
        if self.map().is_some() {
            return Ok(());
        }
        if !renderer_available() {
            return Err("map renderer script is not loaded".to_string());
        }

        let options = to_js(&MapOptions {
            access_token: token,
            style: MAP_STYLE,
            projection: "globe",
            zoom: INITIAL_ZOOM,
            center: INITIAL_CENTER,
            pitch: 0.0,
            bearing: 0.0,
            antialias: true,
        });
        let _ = js_sys::Reflect::set(&options, &JsValue::from_str("container"), container);
        let map = MapboxMap::new(&options).map_err(|e| format!("map init failed: {e:?}"))?;

        let controller = *self;
        let handlers = vec![
            bind(&map, "load", move |_| controller.on_load()),
            bind(&map, "style.load", move |_| controller.discover_layers()),
            bind(&map, "moveend", move |_| controller.on_settle()),
            bind(&map, "click", move |_| controller.stop_rotation()),
            bind(&map, "dragstart", move |_| controller.stop_rotation()),
        ];
        let manifest = config::layer_manifest();
        self.inner.update_value(|inner| {
            inner.map = Some(map);
            inner.manifest = manifest;
            inner.handlers = handlers;
        });
        Ok(())
    }

    fn on_load(&self) {
        if let Some(map) = self.map() {
            let padding = Padding::bottom(sheet_padding(self.sheet_expanded.get_untracked()));
            map.set_padding(&to_js(&padding));
        }
        self.loaded.set(true);
    }

    pub(crate) fn fly_to(&self, lng_lat: [f64; 2], zoom: f64) {
        let Some(map) = self.map() else {
            return;
        };
        self.halt_rotation();
        let padding = Padding::bottom(sheet_padding(self.sheet_expanded.get_untracked()));
        map.fly_to(&to_js(&FlyToOptions {
            center: lng_lat,
            zoom,
            padding,
            duration: FLY_DURATION_MS,
        }));
    }

    pub(crate) fn zoom_in(&self) {
        if let Some(map) = self.map() {
            map.zoom_in(&to_js(&DurationOptions {
                duration: ZOOM_ANIMATION_MS,
            }));
        }
    }

    pub(crate) fn zoom_out(&self) {
        if let Some(map) = self.map() {
            map.zoom_out(&to_js(&DurationOptions {
                duration: ZOOM_ANIMATION_MS,
            }));
        }
    }

    /// Keep camera padding in step with the bottom sheet, then resize once the
    /// sheet transition has finished.
    pub(crate) fn set_sheet_expanded(&self, expanded: bool) {
        self.sheet_expanded.set(expanded);
        let Some(map) = self.map() else {
            return;
        };
        map.set_padding(&to_js(&Padding::bottom(sheet_padding(expanded))));
        map.resize();

        let Some(window) = web_sys::window() else {
            return;
        };
        let cb = Closure::once(move || map.resize());
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            SHEET_TRANSITION_MS as i32,
        );
        cb.forget();
    }

    /// Replace the visitor's own marker.
    pub(crate) fn set_self_marker(&self, coordinate: &Coordinate) {
        let Some(map) = self.map() else {
            return;
        };
        let old = self
            .inner
            .try_update_value(|inner| inner.self_marker.take())
            .flatten();
        if let Some(old) = old {
            old.remove();
        }

        let Some(element) = create_element("div", "osiris-self-marker") else {
            return;
        };
        for class in ["map-marker-pulse", "map-marker-dot"] {
            if let Some(child) = create_element("div", class) {
                let _ = element.append_child(&child);
            }
        }
        let marker = Marker::new(&marker_options(&element));
        marker.set_lng_lat(&to_js(&coordinate.lng_lat()));
        marker.add_to(&map);

        self.inner.update_value(|inner| {
            inner.self_marker = Some(MarkerBinding {
                marker,
                _on_click: None,
            });
        });
    }

    /// Drop every visitor marker and draw one per tile that has a position.
    pub(crate) fn set_visitor_markers(&self, tiles: &[DisplayTile]) {
        let Some(map) = self.map() else {
            return;
        };
        let old = self
            .inner
            .try_update_value(|inner| std::mem::take(&mut inner.visitor_markers))
            .unwrap_or_default();
        for binding in old {
            binding.remove();
        }

        let controller = *self;
        let fresh: Vec<MarkerBinding> = tiles
            .iter()
            .filter_map(|tile| {
                let coordinate = tile.coordinate.as_ref()?;
                let element = create_element(
                    "div",
                    &format!("osiris-visitor-marker {}", tile.status.css_class()),
                )?;
                let _ = element.set_attribute("title", &tile.name);
                if let Some(img) = create_element("img", "osiris-visitor-avatar") {
                    let _ = img.set_attribute("src", tile.avatar);
                    let _ = img.set_attribute("alt", &tile.name);
                    let _ = element.append_child(&img);
                }

                let clicked = tile.clone();
                let on_click = Closure::<dyn FnMut(web_sys::Event)>::new(move |ev: web_sys::Event| {
                    ev.stop_propagation();
                    controller.focus_visitor(clicked.clone());
                });
                let _ = element
                    .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());

                let marker = Marker::new(&marker_options(&element));
                marker.set_lng_lat(&to_js(&coordinate.lng_lat()));
                marker.add_to(&map);
                Some(MarkerBinding {
                    marker,
                    _on_click: Some(on_click),
                })
            })
            .collect();

        self.inner.update_value(|inner| inner.visitor_markers = fresh);
    }

    pub(crate) fn set_poi_markers(&self, points: &[PointOfInterest]) {
        let Some(map) = self.map() else {
            return;
        };
        let old = self
            .inner
            .try_update_value(|inner| std::mem::take(&mut inner.poi_markers))
            .unwrap_or_default();
        for binding in old {
            binding.remove();
        }

        let controller = *self;
        let fresh: Vec<MarkerBinding> = points
            .iter()
            .filter(|point| point.coordinate().is_valid())
            .filter_map(|point| {
                let element = create_element("div", "osiris-poi-marker")?;
                let _ = element.set_attribute("title", &point.brand);
                if let Some(icon) = create_element("span", "material-symbols-outlined") {
                    icon.set_text_content(Some(&point.icon));
                    let _ = element.append_child(&icon);
                }

                let target = point.coordinate().lng_lat();
                let on_click = Closure::<dyn FnMut(web_sys::Event)>::new(move |ev: web_sys::Event| {
                    ev.stop_propagation();
                    controller.fly_to(target, config::FOCUS_ZOOM);
                });
                let _ = element
                    .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());

                let marker = Marker::new(&marker_options(&element));
                marker.set_lng_lat(&to_js(&target));
                marker.add_to(&map);
                Some(MarkerBinding {
                    marker,
                    _on_click: Some(on_click),
                })
            })
            .collect();

        self.inner.update_value(|inner| inner.poi_markers = fresh);
    }

    /// Fly to a visitor and open their profile card.
    pub(crate) fn focus_visitor(&self, tile: DisplayTile) {
        if let Some(coordinate) = tile.coordinate.as_ref() {
            self.fly_to(coordinate.lng_lat(), config::FOCUS_ZOOM);
        }
        self.selected_visitor.set(Some(tile));
    }

    pub(crate) fn toggle_rotation(&self) {
        self.drive_rotation(GlobeRotation::toggle);
    }

    pub(crate) fn stop_rotation(&self) {
        self.drive_rotation(GlobeRotation::stop);
    }

    fn on_settle(&self) {
        self.drive_rotation(GlobeRotation::on_settle);
    }

    fn halt_rotation(&self) {
        self.inner.update_value(|inner| inner.rotation.halt());
        if self.rotation_engaged.get_untracked() {
            self.rotation_engaged.set(false);
        }
    }

    fn drive_rotation(&self, input: fn(&mut GlobeRotation, f64) -> Option<RotationStep>) {
        let Some(map) = self.map() else {
            return;
        };
        let zoom = map.get_zoom();
        let Some((step, engaged)) = self.inner.try_update_value(|inner| {
            let step = input(&mut inner.rotation, zoom);
            (step, inner.rotation.is_engaged())
        }) else {
            return;
        };

        if self.rotation_engaged.get_untracked() != engaged {
            self.rotation_engaged.set(engaged);
        }
        if let Some(step) = step {
            let center = map.get_center();
            let target = [
                wrap_longitude(center.lng() + step.delta_longitude),
                center.lat(),
            ];
            map.ease_to(&linear_ease_options(target, step.duration_ms));
        }
    }

    /// Resolve style layer ids for every kind, then apply the stored visibility.
    fn discover_layers(&self) {
        let Some(map) = self.map() else {
            return;
        };
        let style_layers = read_style_layers(&map);
        let manifest = self
            .inner
            .try_with_value(|inner| inner.manifest.clone())
            .unwrap_or_default();
        let layer_ids: HashMap<LayerKind, Vec<String>> = LayerKind::ALL
            .into_iter()
            .map(|kind| (kind, resolve_layer_ids(kind, &manifest, style_layers.as_deref())))
            .collect();
        self.inner.update_value(|inner| {
            inner.layer_ids = layer_ids;
            inner.style_ready = true;
        });

        let visibility = self.layers.get_untracked();
        for kind in LayerKind::ALL {
            self.apply_layer(&map, kind, visibility.get(kind));
        }
    }

    pub(crate) fn set_layer_visible(&self, kind: LayerKind, visible: bool) {
        self.layers.update(|layers| layers.set(kind, visible));
        let Some(map) = self.map() else {
            return;
        };
        let style_ready = self
            .inner
            .try_with_value(|inner| inner.style_ready)
            .unwrap_or(false);
        if style_ready {
            self.apply_layer(&map, kind, visible);
        }
    }

    fn apply_layer(&self, map: &MapboxMap, kind: LayerKind, visible: bool) {
        let ids = self
            .inner
            .try_with_value(|inner| inner.layer_ids.get(&kind).cloned())
            .flatten()
            .unwrap_or_default();
        let visibility = JsValue::from_str(if visible { "visible" } else { "none" });
        for id in &ids {
            if map.get_layer(id).is_undefined() {
                continue;
            }
            if let Err(e) = map.set_layout_property(id, "visibility", &visibility) {
                warn(&format!("could not toggle layer {id}: {e:?}"));
            }
        }

        if has_method(map, "setConfigProperty") {
            for flag in kind.config_flags() {
                let _ = call_method(
                    map,
                    "setConfigProperty",
                    &[
                        JsValue::from_str("basemap"),
                        JsValue::from_str(flag),
                        JsValue::from_bool(visible),
                    ],
                );
            }
        }

        if kind == LayerKind::Topography {
            set_terrain(map, visible);
        }
    }
}

fn set_terrain(map: &MapboxMap, enabled: bool) {
    if !enabled {
        if let Err(e) = map.set_terrain(&JsValue::NULL) {
            warn(&format!("could not detach terrain: {e:?}"));
        }
        return;
    }

    if map.get_source(TERRAIN_SOURCE_ID).is_undefined() {
        let source = to_js(&DemSource {
            kind: "raster-dem",
            url: TERRAIN_SOURCE_URL,
            tile_size: 512,
            maxzoom: 14.0,
        });
        if let Err(e) = map.add_source(TERRAIN_SOURCE_ID, &source) {
            warn(&format!("could not add terrain source: {e:?}"));
            return;
        }
    }
    let terrain = to_js(&TerrainSpec {
        source: TERRAIN_SOURCE_ID,
        exaggeration: TERRAIN_EXAGGERATION,
    });
    if let Err(e) = map.set_terrain(&terrain) {
        warn(&format!("could not attach terrain: {e:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapsed_sheet_gets_no_bottom_padding() {
        assert_eq!(sheet_padding(false), 0.0);
        assert_eq!(sheet_padding(true), SHEET_COLLAPSED_PADDING_PX);
    }

    #[test]
    fn terrain_source_serializes_with_mapbox_field_names() {
        let value = serde_json::to_value(DemSource {
            kind: "raster-dem",
            url: TERRAIN_SOURCE_URL,
            tile_size: 512,
            maxzoom: 14.0,
        })
        .expect("serialize source");
        assert_eq!(value["type"], "raster-dem");
        assert_eq!(value["tileSize"], 512);
    }
}
