use serde::{Deserialize, Serialize};

/// Where a coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Ip,
    Gps,
}

/// A resolved visitor location. Replaced wholesale on every resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LocationSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            source: None,
            city: None,
            country: None,
        }
    }

    pub fn with_source(mut self, source: LocationSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_place(mut self, city: Option<String>, country: Option<String>) -> Self {
        self.city = city.filter(|c| !c.trim().is_empty());
        self.country = country.filter(|c| !c.trim().is_empty());
        self
    }

    /// `[lng, lat]` pair in the order the map renderer expects.
    pub fn lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// "City, Country" with whichever parts are known.
    pub fn place_label(&self) -> Option<String> {
        match (self.city.as_deref(), self.country.as_deref()) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (Some(city), None) => Some(city.to_string()),
            (None, Some(country)) => Some(country.to_string()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lng_lat_orders_longitude_first() {
        let c = Coordinate::new(49.73, -122.98);
        assert_eq!(c.lng_lat(), [-122.98, 49.73]);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinate::new(45.0, 10.0).is_valid());
        assert!(!Coordinate::new(91.0, 10.0).is_valid());
        assert!(!Coordinate::new(10.0, f64::NAN).is_valid());
    }

    #[test]
    fn place_label_skips_blank_parts() {
        let c = Coordinate::new(0.0, 0.0).with_place(Some("Oslo".into()), Some(" ".into()));
        assert_eq!(c.place_label().as_deref(), Some("Oslo"));
    }

    #[test]
    fn source_serializes_lowercase() {
        let c = Coordinate::new(1.0, 2.0).with_source(LocationSource::Gps);
        let json = serde_json::to_value(&c).expect("serialize coordinate");
        assert_eq!(json["source"], "gps");
        assert!(json.get("city").is_none());
    }
}
