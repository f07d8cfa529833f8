use serde::{Deserialize, Serialize};

/// Distance (px) within which a dragged tile snaps to a sibling's midpoint.
pub(crate) const SNAP_RADIUS_PX: f64 = 24.0;
pub(crate) const TERRAIN_SOURCE_ID: &str = "mapbox-dem";
pub(crate) const TERRAIN_SOURCE_URL: &str = "mapbox://mapbox.mapbox-terrain-dem-v1";
pub(crate) const TERRAIN_EXAGGERATION: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum LayerKind {
    #[serde(rename = "buildings")]
    Buildings,
    #[serde(rename = "topography")]
    Topography,
    #[serde(rename = "names")]
    Names,
    #[serde(rename = "propertyBoundaries", alias = "property-boundaries")]
    PropertyBoundaries,
}

impl LayerKind {
    pub(crate) const ALL: [LayerKind; 4] = [
        LayerKind::Buildings,
        LayerKind::Topography,
        LayerKind::Names,
        LayerKind::PropertyBoundaries,
    ];

    pub(crate) fn key(self) -> &'static str {
        match self {
            Self::Buildings => "buildings",
            Self::Topography => "topography",
            Self::Names => "names",
            Self::PropertyBoundaries => "propertyBoundaries",
        }
    }

    pub(crate) fn from_key(key: &str) -> Option<Self> {
        match key {
            "buildings" => Some(Self::Buildings),
            "topography" => Some(Self::Topography),
            "names" => Some(Self::Names),
            "propertyBoundaries" | "property-boundaries" => Some(Self::PropertyBoundaries),
            _ => None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Buildings => "Buildings",
            Self::Topography => "Topography",
            Self::Names => "Names",
            Self::PropertyBoundaries => "Property lines",
        }
    }

    pub(crate) fn icon(self) -> &'static str {
        match self {
            Self::Buildings => "apartment",
            Self::Topography => "landscape",
            Self::Names => "label",
            Self::PropertyBoundaries => "border_outer",
        }
    }

    /// Basemap configuration flags mirroring this layer kind, where the style has them.
    pub(crate) fn config_flags(self) -> &'static [&'static str] {
        match self {
            Self::Buildings => &["show3dObjects"],
            Self::Topography => &[],
            Self::Names => &[
                "showPlaceLabels",
                "showRoadLabels",
                "showPointOfInterestLabels",
                "showTransitLabels",
            ],
            Self::PropertyBoundaries => &["showAdminBoundaries"],
        }
    }

    fn matches_style_layer(self, layer: &StyleLayer) -> bool {
        let id = layer.id.to_ascii_lowercase();
        let kind = layer.kind.as_str();
        let id_has = |needles: &[&str]| needles.iter().any(|needle| id.contains(needle));
        match self {
            Self::Buildings => kind == "fill-extrusion" || id_has(&["building"]),
            Self::Topography => {
                kind == "hillshade" || id_has(&["hillshade", "contour", "terrain", "landform"])
            }
            Self::Names => kind == "symbol" && id_has(&["label", "place", "name"]),
            Self::PropertyBoundaries => id_has(&["boundary", "parcel", "property", "admin"]),
        }
    }
}

/// Style layer summary as found in `getStyle().layers`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct StyleLayer {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Explicit layer-kind to style-layer-id mapping supplied by the page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct LayerManifest {
    #[serde(default)]
    buildings: Option<Vec<String>>,
    #[serde(default)]
    topography: Option<Vec<String>>,
    #[serde(default)]
    names: Option<Vec<String>>,
    #[serde(default, rename = "propertyBoundaries", alias = "property-boundaries")]
    property_boundaries: Option<Vec<String>>,
}

impl LayerManifest {
    pub(crate) fn entry(&self, kind: LayerKind) -> Option<&[String]> {
        match kind {
            LayerKind::Buildings => self.buildings.as_deref(),
            LayerKind::Topography => self.topography.as_deref(),
            LayerKind::Names => self.names.as_deref(),
            LayerKind::PropertyBoundaries => self.property_boundaries.as_deref(),
        }
    }
}

/// Style layer ids toggled for `kind`.
///
/// A manifest entry always wins. Without one, the style's layers are matched by
/// id and type, but only when the renderer could hand us its style.
pub(crate) fn resolve_layer_ids(
    kind: LayerKind,
    manifest: &LayerManifest,
    style_layers: Option<&[StyleLayer]>,
) -> Vec<String> {
    if let Some(ids) = manifest.entry(kind) {
        return ids.to_vec();
    }
    let Some(style_layers) = style_layers else {
        return Vec::new();
    };
    style_layers
        .iter()
        .filter(|layer| kind.matches_style_layer(layer))
        .map(|layer| layer.id.clone())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LayerVisibility {
    pub buildings: bool,
    pub topography: bool,
    pub names: bool,
    #[serde(rename = "propertyBoundaries")]
    pub property_boundaries: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            buildings: true,
            topography: false,
            names: true,
            property_boundaries: true,
        }
    }
}

impl LayerVisibility {
    pub(crate) fn get(&self, kind: LayerKind) -> bool {
        match kind {
            LayerKind::Buildings => self.buildings,
            LayerKind::Topography => self.topography,
            LayerKind::Names => self.names,
            LayerKind::PropertyBoundaries => self.property_boundaries,
        }
    }

    pub(crate) fn set(&mut self, kind: LayerKind, visible: bool) {
        match kind {
            LayerKind::Buildings => self.buildings = visible,
            LayerKind::Topography => self.topography = visible,
            LayerKind::Names => self.names = visible,
            LayerKind::PropertyBoundaries => self.property_boundaries = visible,
        }
    }
}

/// Display order of the map-data toggle tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LayerOrder(Vec<LayerKind>);

impl Default for LayerOrder {
    fn default() -> Self {
        Self(LayerKind::ALL.to_vec())
    }
}

impl LayerOrder {
    /// Unknown and duplicate keys are dropped; kinds missing from storage go last.
    pub(crate) fn from_stored(keys: &[String]) -> Self {
        let mut kinds: Vec<LayerKind> = Vec::with_capacity(LayerKind::ALL.len());
        for kind in keys.iter().filter_map(|key| LayerKind::from_key(key)) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        for kind in LayerKind::ALL {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Self(kinds)
    }

    pub(crate) fn to_stored(&self) -> Vec<String> {
        self.0.iter().map(|kind| kind.key().to_string()).collect()
    }

    pub(crate) fn kinds(&self) -> &[LayerKind] {
        &self.0
    }
}

/// Insertion slot among the dragged tile's siblings.
///
/// `sibling_midpoints` are the siblings' centers along the drag axis, in display
/// order. The pointer snaps to the nearest midpoint only within `radius`; further
/// away the tile keeps `current_slot`. Slot `j` means "before sibling `j`".
pub(crate) fn snap_slot(
    sibling_midpoints: &[f64],
    pointer: f64,
    current_slot: usize,
    radius: f64,
) -> usize {
    let nearest = sibling_midpoints
        .iter()
        .enumerate()
        .map(|(index, midpoint)| (index, (pointer - midpoint).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((index, distance)) if distance <= radius => {
            if pointer < sibling_midpoints[index] {
                index
            } else {
                index + 1
            }
        }
        _ => current_slot.min(sibling_midpoints.len()),
    }
}

/// In-flight drag of one map-data tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DragSession {
    original: LayerOrder,
    dragged: LayerKind,
    slot: usize,
}

impl DragSession {
    pub(crate) fn begin(order: &LayerOrder, dragged: LayerKind) -> Self {
        let slot = order
            .kinds()
            .iter()
            .position(|kind| *kind == dragged)
            .unwrap_or(0);
        Self {
            original: order.clone(),
            dragged,
            slot,
        }
    }

    pub(crate) fn dragged(&self) -> LayerKind {
        self.dragged
    }

    /// Tiles other than the dragged one, in their pre-drag order.
    pub(crate) fn siblings(&self) -> Vec<LayerKind> {
        self.original
            .kinds()
            .iter()
            .copied()
            .filter(|kind| *kind != self.dragged)
            .collect()
    }

    /// Update the slot from the pointer and return the order to preview.
    pub(crate) fn move_to(&mut self, sibling_midpoints: &[f64], pointer: f64) -> LayerOrder {
        self.slot = snap_slot(sibling_midpoints, pointer, self.slot, SNAP_RADIUS_PX);
        self.preview()
    }

    pub(crate) fn preview(&self) -> LayerOrder {
        let mut kinds = self.siblings();
        let slot = self.slot.min(kinds.len());
        kinds.insert(slot, self.dragged);
        LayerOrder(kinds)
    }

    /// Dropping outside the container puts everything back.
    pub(crate) fn finish(self, inside_container: bool) -> LayerOrder {
        if inside_container {
            self.preview()
        } else {
            self.original
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(id: &str, kind: &str) -> StyleLayer {
        StyleLayer {
            id: id.to_string(),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn manifest_entry_wins_over_heuristics() {
        let manifest: LayerManifest =
            serde_json::from_str(r#"{"buildings":["custom-3d"],"propertyBoundaries":[]}"#)
                .expect("manifest json");
        let layers = vec![style("building-extrusion", "fill-extrusion"), style("admin-0-boundary", "line")];

        assert_eq!(
            resolve_layer_ids(LayerKind::Buildings, &manifest, Some(&layers)),
            vec!["custom-3d"]
        );
        assert!(resolve_layer_ids(LayerKind::PropertyBoundaries, &manifest, Some(&layers)).is_empty());
    }

    #[test]
    fn heuristic_needs_the_style_capability() {
        let manifest = LayerManifest::default();
        let layers = vec![
            style("building", "fill-extrusion"),
            style("hillshade", "hillshade"),
            style("settlement-major-label", "symbol"),
            style("road-label", "symbol"),
            style("road-primary", "line"),
            style("admin-1-boundary", "line"),
        ];

        assert_eq!(
            resolve_layer_ids(LayerKind::Buildings, &manifest, Some(&layers)),
            vec!["building"]
        );
        assert_eq!(
            resolve_layer_ids(LayerKind::Topography, &manifest, Some(&layers)),
            vec!["hillshade"]
        );
        assert_eq!(
            resolve_layer_ids(LayerKind::Names, &manifest, Some(&layers)),
            vec!["settlement-major-label", "road-label"]
        );
        assert_eq!(
            resolve_layer_ids(LayerKind::PropertyBoundaries, &manifest, Some(&layers)),
            vec!["admin-1-boundary"]
        );
        assert!(resolve_layer_ids(LayerKind::Buildings, &manifest, None).is_empty());
    }

    #[test]
    fn stored_order_is_validated() {
        let stored: Vec<String> = ["names", "bogus", "names", "buildings"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let order = LayerOrder::from_stored(&stored);
        assert_eq!(
            order.kinds(),
            &[
                LayerKind::Names,
                LayerKind::Buildings,
                LayerKind::Topography,
                LayerKind::PropertyBoundaries
            ]
        );
    }

    #[test]
    fn reordered_tiles_survive_persist_and_reload() {
        let mut drag = DragSession::begin(&LayerOrder::default(), LayerKind::PropertyBoundaries);
        // Siblings: buildings@50, topography@150, names@250.
        drag.move_to(&[50.0, 150.0, 250.0], 40.0);
        let committed = drag.finish(true);
        assert_eq!(committed.kinds()[0], LayerKind::PropertyBoundaries);

        let stored = serde_json::to_string(&committed.to_stored()).expect("serialize order");
        let reloaded: Vec<String> = serde_json::from_str(&stored).expect("parse order");
        assert_eq!(LayerOrder::from_stored(&reloaded), committed);
    }

    #[test]
    fn drop_outside_restores_pre_drag_order() {
        let original = LayerOrder::default();
        let mut drag = DragSession::begin(&original, LayerKind::Buildings);
        let preview = drag.move_to(&[150.0, 250.0, 350.0], 360.0);
        assert_eq!(preview.kinds().last(), Some(&LayerKind::Buildings));
        assert_eq!(drag.finish(false), original);
    }

    #[test]
    fn snap_only_within_radius() {
        let midpoints = [50.0, 150.0, 250.0];
        assert_eq!(snap_slot(&midpoints, 140.0, 0, SNAP_RADIUS_PX), 1);
        assert_eq!(snap_slot(&midpoints, 160.0, 0, SNAP_RADIUS_PX), 2);
        assert_eq!(snap_slot(&midpoints, 100.0, 3, SNAP_RADIUS_PX), 3);
        assert_eq!(snap_slot(&[], 10.0, 2, SNAP_RADIUS_PX), 0);
    }

    #[test]
    fn visibility_reads_legacy_shape_with_defaults() {
        let visibility: LayerVisibility =
            serde_json::from_str(r#"{"topography":true}"#).expect("visibility json");
        assert!(visibility.get(LayerKind::Topography));
        assert!(visibility.get(LayerKind::Buildings));

        let mut visibility = LayerVisibility::default();
        visibility.set(LayerKind::Names, false);
        assert!(!visibility.get(LayerKind::Names));
    }
}
