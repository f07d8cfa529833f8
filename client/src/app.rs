use leptos::prelude::*;
use osiris_shared::{Coordinate, LocationSource, PointOfInterest, RegisterRequest, now_millis};
use wasm_bindgen_futures::spawn_local;

use crate::config::{self, LOCATED_ZOOM, api_url};
use crate::layers::LayerOrder;
use crate::location::resolve_by_ip;
use crate::map_surface::MapController;
use crate::panels::{
    BackendNotice, BottomSheet, MapControls, ProfilePanel, Toast, ToastView, TokenOverlay,
};
use crate::presence::PresenceClient;
use crate::roster::{DisplayTile, RosterViewModel};
use crate::theme::{self, ThemeMode};

/// Newtype wrappers so signals of the same type stay distinct in context.
#[derive(Clone, Copy)]
pub(crate) struct RosterTiles(pub RwSignal<Vec<DisplayTile>>);
#[derive(Clone, Copy)]
pub(crate) struct Places(pub RwSignal<Vec<PointOfInterest>>);
#[derive(Clone, Copy)]
pub(crate) struct SelfLocation(pub RwSignal<Option<Coordinate>>);
#[derive(Clone, Copy)]
pub(crate) struct PublicIp(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct DisplayName(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct IsAdmin(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct ThemeChoice(pub RwSignal<ThemeMode>);
#[derive(Clone, Copy)]
pub(crate) struct MapToken(pub RwSignal<Option<String>>);
/// Set while the map cannot be shown; drives the token overlay.
#[derive(Clone, Copy)]
pub(crate) struct MapError(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct LayerOrderState(pub RwSignal<LayerOrder>);

fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

async fn fetch_points_of_interest() -> Result<Vec<PointOfInterest>, String> {
    let resp = gloo_net::http::Request::get(&api_url("/api/points-of-interest"))
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<Vec<PointOfInterest>>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

#[component]
pub fn App() -> impl IntoView {
    let controller = MapController::new(config::load_layer_visibility());
    let presence = PresenceClient::new();
    let toast = Toast::new();

    let tiles: RwSignal<Vec<DisplayTile>> = RwSignal::new(Vec::new());
    let points: RwSignal<Vec<PointOfInterest>> = RwSignal::new(Vec::new());
    let location: RwSignal<Option<Coordinate>> = RwSignal::new(None);
    let public_ip: RwSignal<Option<String>> = RwSignal::new(None);
    let display_name: RwSignal<Option<String>> = RwSignal::new(config::display_name());
    let is_admin: RwSignal<bool> = RwSignal::new(false);
    let theme_mode: RwSignal<ThemeMode> = RwSignal::new(theme::stored_mode());
    let token: RwSignal<Option<String>> = RwSignal::new(config::mapbox_token());
    let map_error: RwSignal<Option<String>> = RwSignal::new(None);
    let layer_order: RwSignal<LayerOrder> = RwSignal::new(config::load_layer_order());
    let view_model = StoredValue::new(RosterViewModel::new());

    provide_context(controller);
    provide_context(presence);
    provide_context(toast);
    provide_context(RosterTiles(tiles));
    provide_context(Places(points));
    provide_context(SelfLocation(location));
    provide_context(PublicIp(public_ip));
    provide_context(DisplayName(display_name));
    provide_context(IsAdmin(is_admin));
    provide_context(ThemeChoice(theme_mode));
    provide_context(MapToken(token));
    provide_context(MapError(map_error));
    provide_context(LayerOrderState(layer_order));

    // Persisted preferences
    Effect::new(move |_| {
        let mode = theme_mode.get();
        theme::save_mode(mode);
        theme::apply(mode);
    });
    theme::watch_system_preference();
    Effect::new(move |_| layer_order.with(config::save_layer_order));
    Effect::new(move |_| controller.layers.with(config::save_layer_visibility));

    let map_container = NodeRef::<leptos::html::Div>::new();
    Effect::new(move |_| {
        let Some(container) = map_container.get() else {
            return;
        };
        let Some(token) = token.get() else {
            map_error.set(Some(
                "Enter a Mapbox access token to load the globe.".to_string(),
            ));
            return;
        };
        match controller.mount(&container, &token) {
            Ok(()) => map_error.set(None),
            Err(e) => {
                warn(&format!("map unavailable: {e}"));
                map_error.set(Some(format!("The map could not start: {e}")));
            }
        }
    });

    // Approximate position first; a GPS fix from the controls takes precedence.
    spawn_local(async move {
        let Some(found) = resolve_by_ip().await else {
            return;
        };
        if location.get_untracked().is_none() {
            public_ip.set(found.ip);
            location.set(Some(found.coordinate));
        }
    });

    let initial_fly_done = StoredValue::new(false);
    Effect::new(move |_| {
        if !controller.loaded.get() {
            return;
        }
        let Some(coordinate) = location.get() else {
            return;
        };
        controller.set_self_marker(&coordinate);
        if !initial_fly_done.get_value() {
            initial_fly_done.set_value(true);
            if coordinate.source == Some(LocationSource::Ip) {
                controller.fly_to(coordinate.lng_lat(), LOCATED_ZOOM);
            }
        }
    });

    Effect::new(move |_| {
        if controller.loaded.get() {
            tiles.with(|tiles| controller.set_visitor_markers(tiles));
        }
    });
    Effect::new(move |_| {
        if controller.loaded.get() {
            points.with(|points| controller.set_poi_markers(points));
        }
    });

    spawn_local(async move {
        match fetch_points_of_interest().await {
            Ok(list) => points.set(list),
            Err(e) => warn(&format!("points of interest unavailable: {e}")),
        }
    });
    spawn_local(async move {
        is_admin.set(presence.me().await.is_admin);
    });

    // Restarting on a name change registers the new name right away.
    Effect::new(move |_| {
        let _ = display_name.get();
        presence.start_heartbeat(
            move || {
                let name = display_name.get_untracked()?;
                let coordinate = location.get_untracked();
                Some(RegisterRequest::new(name, coordinate.as_ref(), None))
            },
            move |entries| {
                let now = now_millis();
                let fresh = view_model
                    .try_update_value(|model| model.to_tiles(&entries, now))
                    .unwrap_or_default();
                tiles.set(fresh);
            },
        );
    });
    on_cleanup(move || presence.stop_heartbeat());

    view! {
        <main style="position: fixed; inset: 0; overflow: hidden; background: var(--app-bg);">
            <div
                id="map-app-container"
                node_ref=map_container
                style="position: absolute; inset: 0;"
            />
            <MapControls />
            <ProfilePanel />
            <BottomSheet />
            <BackendNotice />
            <ToastView />
            <TokenOverlay />
        </main>
    }
}
