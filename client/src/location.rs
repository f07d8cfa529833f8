use std::fmt;

use osiris_shared::{Coordinate, LocationSource};
use serde::Deserialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

const IPINFO_URL: &str = "https://ipinfo.io/json";
const IP_API_URL: &str = "http://ip-api.com/json/?fields=lat,lon,city,country,query";

/// Approximate position plus the public address the provider saw.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IpLocation {
    pub coordinate: Coordinate,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocationError {
    Unsupported,
    PermissionDenied,
    Unavailable,
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "geolocation is not supported by this browser"),
            Self::PermissionDenied => write!(f, "location permission was denied"),
            Self::Unavailable => write!(f, "location is currently unavailable"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    #[serde(default)]
    loc: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    ip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    query: Option<String>,
}

/// Null island is what providers report when they know nothing.
fn usable(lat: f64, lng: f64) -> Option<Coordinate> {
    if lat == 0.0 && lng == 0.0 {
        return None;
    }
    let coordinate = Coordinate::new(lat, lng).with_source(LocationSource::Ip);
    coordinate.is_valid().then_some(coordinate)
}

fn from_ipinfo(body: IpInfoResponse) -> Option<IpLocation> {
    let loc = body.loc?;
    let (lat, lng) = loc.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;
    let coordinate = usable(lat, lng)?.with_place(body.city, body.country);
    Some(IpLocation {
        coordinate,
        ip: body.ip,
    })
}

fn from_ip_api(body: IpApiResponse) -> Option<IpLocation> {
    let coordinate = usable(body.lat?, body.lon?)?.with_place(body.city, body.country);
    Some(IpLocation {
        coordinate,
        ip: body.query,
    })
}

async fn fetch_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<T>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// Primary provider first, then the fallback. `None` when both fail.
pub(crate) async fn resolve_by_ip() -> Option<IpLocation> {
    match fetch_json::<IpInfoResponse>(IPINFO_URL).await {
        Ok(body) => {
            if let Some(found) = from_ipinfo(body) {
                return Some(found);
            }
            web_sys::console::warn_1(&"IP geolocation (ipinfo) returned no position".into());
        }
        Err(e) => {
            web_sys::console::warn_1(&format!("IP geolocation (ipinfo) failed: {e}").into());
        }
    }

    match fetch_json::<IpApiResponse>(IP_API_URL).await {
        Ok(body) => {
            let found = from_ip_api(body);
            if found.is_none() {
                web_sys::console::warn_1(&"IP geolocation (ip-api) returned no position".into());
            }
            found
        }
        Err(e) => {
            web_sys::console::warn_1(&format!("IP geolocation (ip-api) failed: {e}").into());
            None
        }
    }
}

/// Ask the device for a high-accuracy fix.
pub(crate) async fn resolve_by_gps() -> Result<Coordinate, LocationError> {
    let geolocation = web_sys::window()
        .ok_or(LocationError::Unsupported)?
        .navigator()
        .geolocation()
        .map_err(|_| LocationError::Unsupported)?;

    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let options = web_sys::PositionOptions::new();
        options.set_enable_high_accuracy(true);
        if let Err(e) = geolocation.get_current_position_with_error_callback_and_options(
            &resolve,
            Some(&reject),
            &options,
        ) {
            let _ = reject.call1(&JsValue::NULL, &e);
        }
    });

    let position = JsFuture::from(promise).await.map_err(classify_gps_error)?;
    if !position.is_object() {
        return Err(LocationError::Unavailable);
    }
    // Browsers name the class GeolocationPosition, so an instanceof check would fail.
    let position: web_sys::Position = position.unchecked_into();
    let coords = position.coords();
    let coordinate = Coordinate::new(coords.latitude(), coords.longitude())
        .with_source(LocationSource::Gps);
    if coordinate.is_valid() {
        Ok(coordinate)
    } else {
        Err(LocationError::Unavailable)
    }
}

fn classify_gps_error(err: JsValue) -> LocationError {
    js_sys::Reflect::get(&err, &JsValue::from_str("code"))
        .ok()
        .and_then(|code| code.as_f64())
        .and_then(|code| u16::try_from(code as i64).ok())
        .map_or(LocationError::Unavailable, gps_error_from_code)
}

fn gps_error_from_code(code: u16) -> LocationError {
    if code == web_sys::PositionError::PERMISSION_DENIED {
        LocationError::PermissionDenied
    } else {
        LocationError::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipinfo(raw: &str) -> Option<IpLocation> {
        from_ipinfo(serde_json::from_str(raw).expect("ipinfo json"))
    }

    fn ip_api(raw: &str) -> Option<IpLocation> {
        from_ip_api(serde_json::from_str(raw).expect("ip-api json"))
    }

    #[test]
    fn ipinfo_loc_string_is_split_into_coordinate() {
        let found = ipinfo(r#"{"ip":"203.0.113.5","city":"Oslo","country":"NO","loc":"59.9127,10.7461"}"#)
            .expect("position");
        assert_eq!(found.coordinate.latitude, 59.9127);
        assert_eq!(found.coordinate.longitude, 10.7461);
        assert_eq!(found.coordinate.source, Some(LocationSource::Ip));
        assert_eq!(found.coordinate.place_label().as_deref(), Some("Oslo, NO"));
        assert_eq!(found.ip.as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn ipinfo_without_usable_loc_yields_nothing() {
        assert!(ipinfo(r#"{"ip":"203.0.113.5"}"#).is_none());
        assert!(ipinfo(r#"{"loc":"0,0"}"#).is_none());
        assert!(ipinfo(r#"{"loc":"not,a-number"}"#).is_none());
        assert!(ipinfo(r#"{"loc":"95.0,10.0"}"#).is_none());
    }

    #[test]
    fn ip_api_fields_map_to_coordinate() {
        let found = ip_api(r#"{"lat":48.85,"lon":2.35,"city":"Paris","country":"France","query":"198.51.100.2"}"#)
            .expect("position");
        assert_eq!(found.coordinate.lng_lat(), [2.35, 48.85]);
        assert_eq!(found.ip.as_deref(), Some("198.51.100.2"));
        assert!(ip_api(r#"{"lat":0,"lon":0}"#).is_none());
        assert!(ip_api(r#"{"city":"Paris"}"#).is_none());
    }

    #[test]
    fn permission_code_is_distinguished() {
        assert_eq!(gps_error_from_code(1), LocationError::PermissionDenied);
        assert_eq!(gps_error_from_code(2), LocationError::Unavailable);
        assert_eq!(gps_error_from_code(3), LocationError::Unavailable);
    }
}
