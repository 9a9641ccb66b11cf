//! Client IP allow-list.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::rate_limit::client_ip;
use crate::state::ServiceContext;

/// Resolves the client IP the same way the rate limiter does and rejects
/// with a bare `403 Forbidden` unless it appears in the configured
/// allow-list.
pub async fn ip_allow(
    State(ctx): State<ServiceContext>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let ip = client_ip(req.headers(), peer).to_string();

    if !ctx.config.server.allowed_ips.iter().any(|a| a == &ip) {
        metrics::counter!("requests_ip_forbidden").increment(1);
        tracing::warn!(%ip, "client ip not in allow-list");
        return StatusCode::FORBIDDEN.into_response();
    }

    next.run(req).await
}
