pub mod health;
pub mod poi;
pub mod users;

use axum::body::Body;
use axum::http::{HeaderValue, header};
use axum::response::Response;
use bytes::Bytes;

pub(crate) fn json_bytes_response(body: Bytes, cache_control: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    response
}

/// Serialize `value` as JSON with the given cache policy.
pub(crate) fn json_response<T: serde::Serialize>(
    value: &T,
    cache_control: &'static str,
) -> Response {
    let body = serde_json::to_vec(value)
        .map(Bytes::from)
        .unwrap_or_else(|_| Bytes::from_static(b"null"));
    json_bytes_response(body, cache_control)
}
