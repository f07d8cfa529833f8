use gloo_storage::{LocalStorage, SessionStorage, Storage};
use wasm_bindgen::JsValue;

use crate::layers::{LayerManifest, LayerOrder, LayerVisibility};

pub(crate) const HEARTBEAT_INTERVAL_MS: u32 = 5_000;

pub(crate) const MAP_STYLE: &str = "mapbox://styles/glassiat/cmls0szp3002g01qofq7m5j2e";
pub(crate) const INITIAL_CENTER: [f64; 2] = [0.0, 20.0];
pub(crate) const INITIAL_ZOOM: f64 = 1.0;
/// Zoom used for the first fly-to after the visitor is located.
pub(crate) const LOCATED_ZOOM: f64 = 10.0;
/// Zoom used when the visitor focuses a marker, tile or their own position.
pub(crate) const FOCUS_ZOOM: f64 = 14.0;
pub(crate) const FLY_DURATION_MS: u32 = 4_000;
pub(crate) const ZOOM_ANIMATION_MS: u32 = 1_200;

pub(crate) const SHEET_EXPANDED_HEIGHT: &str = "380px";
pub(crate) const SHEET_PEEK_HEIGHT: &str = "80px";
pub(crate) const SHEET_COLLAPSED_PADDING_PX: f64 = 40.0;
pub(crate) const SHEET_TRANSITION_MS: u32 = 300;

pub(crate) const TOAST_DURATION_MS: u32 = 3_000;

pub(crate) const DISPLAY_NAME_KEY: &str = "osiris_display_name";
pub(crate) const THEME_KEY: &str = "osiris_theme";
pub(crate) const MAPBOX_TOKEN_KEY: &str = "mapbox_access_token";
pub(crate) const MAP_DATA_ORDER_KEY: &str = "osiris_map_data_order";
pub(crate) const MAP_LAYERS_KEY: &str = "osiris_map_layers";

pub(crate) const AVATARS: [&str; 8] = [
    "https://i.pravatar.cc/150?img=3",
    "https://i.pravatar.cc/150?img=5",
    "https://i.pravatar.cc/150?img=8",
    "https://i.pravatar.cc/150?img=12",
    "https://i.pravatar.cc/150?img=15",
    "https://i.pravatar.cc/150?img=20",
    "https://i.pravatar.cc/150?img=32",
    "https://i.pravatar.cc/150?img=47",
];

fn page_global(name: &str) -> Option<JsValue> {
    let window = web_sys::window()?;
    js_sys::Reflect::get(&window, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn page_string(name: &str) -> Option<String> {
    page_global(name)?
        .as_string()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Backend base URL from `window.OSIRIS_API_URL`; empty means same origin.
pub(crate) fn api_base() -> String {
    page_string("OSIRIS_API_URL").unwrap_or_default()
}

pub(crate) fn api_url(path: &str) -> String {
    join_api_url(&api_base(), path)
}

fn join_api_url(base: &str, path: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Token saved by the visitor, else the deployment default.
pub(crate) fn mapbox_token() -> Option<String> {
    read_raw_local(MAPBOX_TOKEN_KEY)
        .or_else(|| page_string("MAPBOX_DEFAULT_TOKEN"))
}

pub(crate) fn save_mapbox_token(token: &str) {
    write_raw_local(MAPBOX_TOKEN_KEY, token.trim());
}

pub(crate) fn layer_manifest() -> LayerManifest {
    let Some(raw) = page_global("OSIRIS_LAYER_MANIFEST") else {
        return LayerManifest::default();
    };
    match serde_wasm_bindgen::from_value::<LayerManifest>(raw) {
        Ok(manifest) => manifest,
        Err(e) => {
            web_sys::console::warn_1(&format!("ignoring malformed layer manifest: {e}").into());
            LayerManifest::default()
        }
    }
}

pub(crate) fn display_name() -> Option<String> {
    SessionStorage::raw()
        .get_item(DISPLAY_NAME_KEY)
        .ok()
        .flatten()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

pub(crate) fn save_display_name(name: &str) {
    let _ = SessionStorage::raw().set_item(DISPLAY_NAME_KEY, name.trim());
}

pub(crate) fn load_layer_order() -> LayerOrder {
    LocalStorage::get::<Vec<String>>(MAP_DATA_ORDER_KEY)
        .map(|keys| LayerOrder::from_stored(&keys))
        .unwrap_or_default()
}

pub(crate) fn save_layer_order(order: &LayerOrder) {
    if let Err(e) = LocalStorage::set(MAP_DATA_ORDER_KEY, order.to_stored()) {
        web_sys::console::warn_1(&format!("could not persist layer order: {e}").into());
    }
}

pub(crate) fn load_layer_visibility() -> LayerVisibility {
    LocalStorage::get::<LayerVisibility>(MAP_LAYERS_KEY).unwrap_or_default()
}

pub(crate) fn save_layer_visibility(visibility: &LayerVisibility) {
    if let Err(e) = LocalStorage::set(MAP_LAYERS_KEY, visibility) {
        web_sys::console::warn_1(&format!("could not persist layer visibility: {e}").into());
    }
}

/// Plain string values stay readable by pages that wrote them without JSON quoting.
pub(crate) fn read_raw_local(key: &str) -> Option<String> {
    LocalStorage::raw()
        .get_item(key)
        .ok()
        .flatten()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn write_raw_local(key: &str, value: &str) {
    let _ = LocalStorage::raw().set_item(key, value);
}
