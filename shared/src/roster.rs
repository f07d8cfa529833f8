use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::Coordinate;

/// One registered visitor as served by `GET /api/users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub ip: String,
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub last_seen: i64,
}

impl RosterEntry {
    pub fn coordinate(&self) -> Option<Coordinate> {
        let (lat, lng) = (self.lat?, self.lng?);
        let coordinate =
            Coordinate::new(lat, lng).with_place(self.city.clone(), self.country.clone());
        coordinate.is_valid().then_some(coordinate)
    }
}

/// Payload for `POST /api/users`. Only `name` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub lat: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl RegisterRequest {
    pub fn new(name: impl Into<String>, location: Option<&Coordinate>, ip: Option<String>) -> Self {
        Self {
            name: name.into(),
            ip,
            lat: location.map(|c| c.latitude),
            lng: location.map(|c| c.longitude),
            city: location.and_then(|c| c.city.clone()),
            country: location.and_then(|c| c.country.clone()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accepts a JSON number, a numeric string, an empty string or null.
/// Query strings and form bodies deliver every value as text.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(value)) => Some(value),
        Some(NumberOrText::Text(text)) => text.trim().parse::<f64>().ok(),
        None => None,
    }
    .filter(|value| value.is_finite()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const OK: Self = Self { ok: true };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response of `GET /api/users/me`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_entry_reads_backend_shape() {
        let raw = r#"[{"id":3,"ip":"10.0.0.2","name":"Ada","lat":59.91,"lng":10.75,
            "city":"Oslo","country":"NO","lastSeen":1760000000000}]"#;
        let entries: Vec<RosterEntry> = serde_json::from_str(raw).expect("parse roster");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].last_seen, 1_760_000_000_000);
        let coordinate = entries[0].coordinate().expect("coordinate present");
        assert_eq!(coordinate.place_label().as_deref(), Some("Oslo, NO"));
    }

    #[test]
    fn roster_entry_without_location_has_no_coordinate() {
        let raw = r#"{"id":1,"ip":"","name":"Bo","lat":null,"lng":null,"city":null,"country":null,"lastSeen":1}"#;
        let entry: RosterEntry = serde_json::from_str(raw).expect("parse entry");
        assert!(entry.coordinate().is_none());
    }

    #[test]
    fn register_request_accepts_numeric_strings() {
        let raw = r#"{"name":"Ada","lat":"59.5","lng":"","city":"Oslo"}"#;
        let req: RegisterRequest = serde_json::from_str(raw).expect("parse register");
        assert_eq!(req.lat, Some(59.5));
        assert_eq!(req.lng, None);
        assert_eq!(req.city.as_deref(), Some("Oslo"));
    }

    #[test]
    fn register_request_omits_missing_fields() {
        let req = RegisterRequest::new("Ada", None, None);
        let json = serde_json::to_string(&req).expect("serialize register");
        assert_eq!(json, r#"{"name":"Ada"}"#);
    }

    #[test]
    fn admin_status_uses_camel_case() {
        let json = serde_json::to_string(&AdminStatus { is_admin: true }).expect("serialize");
        assert_eq!(json, r#"{"isAdmin":true}"#);
    }
}
