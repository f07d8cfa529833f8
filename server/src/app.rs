use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config;
use crate::routes::{health, poi, users};
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(config::static_dir())
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    // `.php` aliases keep older front-end builds working against this server.
    let api = Router::new()
        .route("/api/users", get(users::list_users).post(users::register_post))
        .route("/api/users.php", get(users::list_users))
        .route(
            "/api/users-register",
            get(users::register_get).post(users::register_post),
        )
        .route(
            "/api/users-register.php",
            get(users::register_get).post(users::register_post),
        )
        .route(
            "/api/users-clear",
            get(users::clear_users).post(users::clear_users),
        )
        .route(
            "/api/users-clear.php",
            get(users::clear_users).post(users::clear_users),
        )
        .route("/api/users/me", get(users::me))
        .route("/api/users-me.php", get(users::me))
        .route(
            "/api/users/{id}",
            get(users::delete_user).delete(users::delete_user),
        )
        .route(
            "/api/users-delete.php",
            get(users::delete_user_legacy).delete(users::delete_user_legacy),
        )
        .route("/api/points-of-interest", get(poi::get_points_of_interest))
        .route(
            "/api/points-of-interest.php",
            get(poi::get_points_of_interest),
        )
        .route("/points-of-interest.php", get(poi::get_points_of_interest))
        .route("/api/health", get(health::health))
        .layer(cors_layer());

    api.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if is_fingerprinted_asset(path) {
        return Some("public, max-age=31536000, immutable");
    }

    if path.starts_with("/icons/") || path.starts_with("/avatars/") {
        return Some("public, max-age=86400");
    }

    None
}

/// Trunk emits `name-<hex hash>.ext`; those never change once published.
fn is_fingerprinted_asset(path: &str) -> bool {
    let path = Path::new(path);
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    if !matches!(ext, "wasm" | "js" | "css") {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(|name| name.to_str()) else {
        return false;
    };

    stem.split(['-', '_'])
        .any(|segment| segment.len() >= 8 && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::db_users::memory_pool;
    use crate::state::AdminList;

    #[test]
    fn fingerprinted_bundle_is_cached_forever() {
        assert_eq!(
            cache_control_for_path("/osiris-client-5c1f0e9a2b7d4e31_bg.wasm"),
            Some("public, max-age=31536000, immutable")
        );
        assert_eq!(
            cache_control_for_path("/styles-a93762ff3bf6d63a.css"),
            Some("public, max-age=31536000, immutable")
        );
    }

    #[test]
    fn icons_get_a_day_and_html_gets_nothing() {
        assert_eq!(
            cache_control_for_path("/icons/pin.svg"),
            Some("public, max-age=86400")
        );
        assert_eq!(cache_control_for_path("/"), None);
        assert_eq!(cache_control_for_path("/index.html"), None);
        assert_eq!(cache_control_for_path("/app.js"), None);
    }

    #[tokio::test]
    async fn preflight_allows_any_origin() {
        let state = AppState::new(memory_pool().await, AdminList::default());
        let response = build_app(state)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/users")
                    .header(header::ORIGIN, "https://portfolio.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .expect("preflight request"),
            )
            .await
            .expect("preflight response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }
}
