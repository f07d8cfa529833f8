use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A landmark rendered as a map marker and a tile in the POI tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: i64,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub icon: String,
    pub lat: f64,
    pub lng: f64,
}

impl PointOfInterest {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}
