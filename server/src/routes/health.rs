use axum::Json;
use axum::extract::State;

use crate::db_users;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let users = match db_users::count(&state.db).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not count users");
            None
        }
    };
    let points_of_interest = state.points_of_interest.read().await.points.len();
    let observability = state.observability.snapshot();
    tracing::debug!(
        points_of_interest,
        admins_configured = state.admins.len(),
        registrations_total = observability.registrations_total,
        list_requests_total = observability.list_requests_total,
        rejected_requests_total = observability.rejected_requests_total,
        "health check"
    );
    Json(serde_json::json!({
        "status": if users.is_some() { "ok" } else { "degraded" },
        "users": users,
    }))
}
