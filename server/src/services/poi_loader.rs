use std::path::{Path, PathBuf};
use std::time::Duration;

use osiris_shared::PointOfInterest;
use tracing::{info, warn};

use crate::config::POI_REFRESH_SECS;
use crate::state::{AppState, PoiSnapshot};

#[derive(Debug)]
pub enum PoiLoadError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for PoiLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "read failed: {e}"),
            Self::Parse(e) => write!(f, "parse failed: {e}"),
        }
    }
}

impl std::error::Error for PoiLoadError {}

pub async fn run(state: AppState, path: PathBuf) {
    let mut interval = tokio::time::interval(Duration::from_secs(POI_REFRESH_SECS));

    // First tick fires immediately.
    loop {
        interval.tick().await;
        refresh(&state, &path).await;
    }
}

/// Reload once. A failed read keeps the previous snapshot.
pub async fn refresh(state: &AppState, path: &Path) -> bool {
    match load_points(path).await {
        Ok(points) => {
            let count = points.len();
            *state.points_of_interest.write().await = PoiSnapshot::new(points);
            info!(count, path = %path.display(), "loaded points of interest");
            true
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to load points of interest");
            false
        }
    }
}

async fn load_points(path: &Path) -> Result<Vec<PointOfInterest>, PoiLoadError> {
    let raw = tokio::fs::read(path).await.map_err(PoiLoadError::Io)?;
    let points: Vec<PointOfInterest> = serde_json::from_slice(&raw).map_err(PoiLoadError::Parse)?;
    Ok(points
        .into_iter()
        .filter(|point| point.coordinate().is_valid())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_users::memory_pool;
    use crate::state::AdminList;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "osiris-poi-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, contents).expect("write scratch file");
        path
    }

    #[tokio::test]
    async fn refresh_replaces_snapshot_and_drops_invalid_points() {
        let state = AppState::new(memory_pool().await, AdminList::default());
        let path = scratch_file(
            "valid",
            r#"[
                {"id":1,"brand":"Cafe","location":"Paris","type":"food","icon":"coffee","lat":48.85,"lng":2.35},
                {"id":2,"brand":"Nowhere","location":"?","type":"shop","icon":"pin","lat":123.0,"lng":0.0}
            ]"#,
        );

        assert!(refresh(&state, &path).await);
        let snapshot = state.points_of_interest.read().await.clone();
        assert_eq!(snapshot.points.len(), 1);
        assert_eq!(snapshot.points[0].brand, "Cafe");
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let state = AppState::new(memory_pool().await, AdminList::default());
        let good = scratch_file(
            "keep",
            r#"[{"id":1,"brand":"Cafe","location":"Paris","type":"food","icon":"coffee","lat":48.85,"lng":2.35}]"#,
        );
        assert!(refresh(&state, &good).await);

        let broken = scratch_file("broken", "{not json");
        assert!(!refresh(&state, &broken).await);
        assert!(!refresh(&state, Path::new("/definitely/missing/poi.json")).await);
        assert_eq!(state.points_of_interest.read().await.points.len(), 1);

        let _ = std::fs::remove_file(good);
        let _ = std::fs::remove_file(broken);
    }

    #[tokio::test]
    async fn bundled_data_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/points-of-interest.json");
        let points = load_points(&path).await.expect("bundled points load");
        assert!(!points.is_empty());
    }
}
