use js_sys::{Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Map)]
    #[derive(Clone)]
    pub(crate) type MapboxMap;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Map", catch)]
    pub(crate) fn new(options: &JsValue) -> Result<MapboxMap, JsValue>;

    #[wasm_bindgen(method)]
    pub(crate) fn on(this: &MapboxMap, event: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = flyTo)]
    pub(crate) fn fly_to(this: &MapboxMap, options: &JsValue);

    #[wasm_bindgen(method, js_name = easeTo)]
    pub(crate) fn ease_to(this: &MapboxMap, options: &JsValue);

    #[wasm_bindgen(method, js_name = getCenter)]
    pub(crate) fn get_center(this: &MapboxMap) -> LngLat;

    #[wasm_bindgen(method, js_name = getZoom)]
    pub(crate) fn get_zoom(this: &MapboxMap) -> f64;

    #[wasm_bindgen(method, js_name = setPadding)]
    pub(crate) fn set_padding(this: &MapboxMap, padding: &JsValue);

    #[wasm_bindgen(method)]
    pub(crate) fn resize(this: &MapboxMap);

    #[wasm_bindgen(method, js_name = zoomIn)]
    pub(crate) fn zoom_in(this: &MapboxMap, options: &JsValue);

    #[wasm_bindgen(method, js_name = zoomOut)]
    pub(crate) fn zoom_out(this: &MapboxMap, options: &JsValue);

    #[wasm_bindgen(method, js_name = setLayoutProperty, catch)]
    pub(crate) fn set_layout_property(
        this: &MapboxMap,
        layer_id: &str,
        name: &str,
        value: &JsValue,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = getLayer)]
    pub(crate) fn get_layer(this: &MapboxMap, layer_id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = getSource)]
    pub(crate) fn get_source(this: &MapboxMap, source_id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = addSource, catch)]
    pub(crate) fn add_source(
        this: &MapboxMap,
        source_id: &str,
        source: &JsValue,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = setTerrain, catch)]
    pub(crate) fn set_terrain(this: &MapboxMap, terrain: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = LngLat)]
    pub(crate) type LngLat;

    #[wasm_bindgen(method, getter)]
    pub(crate) fn lng(this: &LngLat) -> f64;

    #[wasm_bindgen(method, getter)]
    pub(crate) fn lat(this: &LngLat) -> f64;

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Marker)]
    pub(crate) type Marker;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Marker")]
    pub(crate) fn new(options: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = setLngLat)]
    pub(crate) fn set_lng_lat(this: &Marker, lng_lat: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = addTo)]
    pub(crate) fn add_to(this: &Marker, map: &MapboxMap) -> Marker;

    #[wasm_bindgen(method)]
    pub(crate) fn remove(this: &Marker);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MapOptions<'a> {
    pub access_token: &'a str,
    pub style: &'a str,
    pub projection: &'a str,
    pub zoom: f64,
    pub center: [f64; 2],
    pub pitch: f64,
    pub bearing: f64,
    pub antialias: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub(crate) fn bottom(bottom: f64) -> Self {
        Self {
            top: 0.0,
            right: 0.0,
            bottom,
            left: 0.0,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct FlyToOptions {
    pub center: [f64; 2],
    pub zoom: f64,
    pub padding: Padding,
    pub duration: u32,
}

#[derive(Serialize)]
pub(crate) struct DurationOptions {
    pub duration: u32,
}

/// Plain-data values to JS objects. Maps become objects rather than `Map`s.
pub(crate) fn to_js<T: Serialize>(value: &T) -> JsValue {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).unwrap_or(JsValue::UNDEFINED)
}

/// Whether the renderer exposes `name` as a callable method.
pub(crate) fn has_method(target: &JsValue, name: &str) -> bool {
    Reflect::get(target, &JsValue::from_str(name)).is_ok_and(|value| value.is_function())
}

/// Call an optional renderer method; `None` if it is absent.
pub(crate) fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> Option<JsValue> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .filter(JsValue::is_function)?
        .into();
    let args: js_sys::Array = args.iter().collect();
    method.apply(target, &args).ok()
}

/// `true` once `window.mapboxgl` has been loaded by the page.
pub(crate) fn renderer_available() -> bool {
    web_sys::window()
        .and_then(|window| Reflect::get(&window, &JsValue::from_str("mapboxgl")).ok())
        .is_some_and(|value| value.is_object())
}

pub(crate) fn marker_options(element: &web_sys::Element) -> JsValue {
    let options = Object::new();
    let _ = Reflect::set(&options, &JsValue::from_str("element"), element);
    let _ = Reflect::set(
        &options,
        &JsValue::from_str("anchor"),
        &JsValue::from_str("center"),
    );
    options.into()
}

/// Linear easing, so chained rotation pans keep a constant angular speed.
pub(crate) fn linear_ease_options(center: [f64; 2], duration_ms: u32) -> JsValue {
    let options = Object::new();
    let _ = Reflect::set(&options, &JsValue::from_str("center"), &to_js(&center));
    let _ = Reflect::set(
        &options,
        &JsValue::from_str("duration"),
        &JsValue::from_f64(f64::from(duration_ms)),
    );
    let linear = Function::new_with_args("n", "return n;");
    let _ = Reflect::set(&options, &JsValue::from_str("easing"), &linear);
    options.into()
}
