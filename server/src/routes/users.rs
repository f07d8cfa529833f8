use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, header};
use axum::response::Response;
use bytes::Bytes;
use osiris_shared::{AdminStatus, OkResponse, RegisterRequest, now_millis};
use serde::Deserialize;
use tracing::{info, warn};

use crate::client_ip::ClientIp;
use crate::config::MAX_NAME_LEN;
use crate::db_users::{self, UserUpsert};
use crate::error::ApiError;
use crate::routes::json_response;
use crate::state::AppState;

const NO_STORE: &str = "no-store, no-cache, must-revalidate";

pub async fn list_users(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.observability.record_list_request();
    let users = db_users::list(&state.db).await?;
    Ok(json_response(&users, NO_STORE))
}

/// `GET /api/users-register?name=...`: the query-string fallback for hosts that block POST.
pub async fn register_get(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let request = query
        .as_deref()
        .and_then(|raw| serde_urlencoded::from_str::<RegisterRequest>(raw).ok())
        .unwrap_or_default();
    register(&state, request, &client_ip).await
}

pub async fn register_post(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let request = parse_register_body(content_type, &body);
    register(&state, request, &client_ip).await
}

async fn register(
    state: &AppState,
    request: RegisterRequest,
    client_ip: &str,
) -> Result<Response, ApiError> {
    let user = validate_register(request, client_ip)?;
    db_users::upsert(&state.db, &user, now_millis()).await?;
    state.observability.record_registration();
    Ok(json_response(&OkResponse::OK, NO_STORE))
}

/// JSON first, then form-urlencoded. Anything unreadable becomes an empty request.
fn parse_register_body(content_type: &str, body: &[u8]) -> RegisterRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return RegisterRequest::default();
    }
    let json_first = content_type.contains("json");
    let from_json = || serde_json::from_slice::<RegisterRequest>(body).ok();
    let from_form = || serde_urlencoded::from_bytes::<RegisterRequest>(body).ok();
    let parsed = if json_first {
        from_json().or_else(from_form)
    } else {
        from_form()
            .filter(|request| !request.name.trim().is_empty())
            .or_else(from_json)
    };
    parsed.unwrap_or_default()
}

fn validate_register(request: RegisterRequest, client_ip: &str) -> Result<UserUpsert, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name required"));
    }
    if name.chars().count() > MAX_NAME_LEN || name.chars().any(char::is_control) {
        return Err(ApiError::bad_request("invalid name"));
    }

    let (lat, lng) = match (request.lat, request.lng) {
        (Some(lat), Some(lng))
            if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) =>
        {
            (Some(lat), Some(lng))
        }
        _ => (None, None),
    };

    let ip = request
        .ip
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| client_ip.to_string());

    Ok(UserUpsert {
        name: name.to_string(),
        ip,
        lat,
        lng,
        city: non_blank(request.city),
        country: non_blank(request.country),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Wipe the whole roster. Administrators only.
pub async fn clear_users(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
) -> Result<Response, ApiError> {
    if !state.admins.is_admin(&client_ip) {
        state.observability.record_rejected_request();
        warn!(%client_ip, "rejected roster clear from non-admin");
        return Err(ApiError::forbidden("Administrator access required"));
    }
    let removed = db_users::clear(&state.db).await?;
    info!(removed, %client_ip, "roster cleared");
    Ok(json_response(&OkResponse::OK, NO_STORE))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    delete_by_id(&state, &client_ip, parse_id(Some(raw_id.as_str()))).await
}

#[derive(Deserialize)]
struct IdQuery {
    #[serde(default)]
    id: Option<String>,
}

/// `users-delete.php?id=N`
pub async fn delete_user_legacy(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let raw_id = query
        .as_deref()
        .and_then(|raw| serde_urlencoded::from_str::<IdQuery>(raw).ok())
        .and_then(|q| q.id);
    delete_by_id(&state, &client_ip, parse_id(raw_id.as_deref())).await
}

fn parse_id(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

async fn delete_by_id(state: &AppState, client_ip: &str, id: i64) -> Result<Response, ApiError> {
    if id < 1 {
        return Err(ApiError::bad_request("id required"));
    }

    let Some(owner_ip) = db_users::owner_ip(&state.db, id).await? else {
        return Err(ApiError::not_found("User not found"));
    };

    let is_admin = state.admins.is_admin(client_ip);
    let is_own_profile = !client_ip.is_empty() && owner_ip == client_ip;
    if !is_admin && !is_own_profile {
        state.observability.record_rejected_request();
        warn!(id, %client_ip, "rejected delete of another visitor's profile");
        return Err(ApiError::forbidden("You can only delete your own profile"));
    }

    db_users::delete(&state.db, id).await?;
    Ok(json_response(&OkResponse::OK, NO_STORE))
}

pub async fn me(State(state): State<AppState>, ClientIp(client_ip): ClientIp) -> Response {
    let status = AdminStatus {
        is_admin: state.admins.is_admin(&client_ip),
    };
    json_response(&status, NO_STORE)
}
