use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use bytes::Bytes;

use crate::routes::json_bytes_response;
use crate::state::AppState;

/// Serve the pre-serialized point-of-interest list.
pub async fn get_points_of_interest(State(state): State<AppState>) -> Response {
    let json: Arc<Bytes> = Arc::clone(&state.points_of_interest.read().await.json);
    json_bytes_response((*json).clone(), "public, max-age=300")
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use osiris_shared::PointOfInterest;
    use tower::ServiceExt;

    use crate::db_users::memory_pool;
    use crate::state::{AdminList, AppState, PoiSnapshot};

    #[tokio::test]
    async fn serves_current_snapshot_on_both_paths() {
        let state = AppState::new(memory_pool().await, AdminList::default());
        *state.points_of_interest.write().await = PoiSnapshot::new(vec![PointOfInterest {
            id: 7,
            brand: "Harbour Books".into(),
            location: "Oslo".into(),
            kind: "shop".into(),
            icon: "book".into(),
            lat: 59.91,
            lng: 10.75,
        }]);

        for uri in ["/api/points-of-interest", "/points-of-interest.php"] {
            let response = crate::app::build_app(state.clone())
                .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response
                    .headers()
                    .get(header::CACHE_CONTROL)
                    .and_then(|v| v.to_str().ok()),
                Some("public, max-age=300")
            );
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body");
            let points: Vec<PointOfInterest> = serde_json::from_slice(&body).expect("parse");
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].brand, "Harbour Books");
        }
    }
}
