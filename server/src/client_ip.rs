use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::state::{AppState, TrustedProxies};

/// Address of the caller. The first `X-Forwarded-For` hop is only honored
/// when the socket peer is a trusted proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(resolve_client_ip(
            &parts.headers,
            peer,
            &state.trusted_proxies,
        )))
    }
}

pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted: &TrustedProxies,
) -> String {
    let peer_ip = peer
        .map(|addr| addr.ip().to_canonical().to_string())
        .unwrap_or_default();
    if !trusted.contains(&peer_ip) {
        return peer_ip;
    }

    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map_or(peer_ip.clone(), str::to_string)
}
