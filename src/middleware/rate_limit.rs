//! Per-IP admission control.
//!
//! The limiter is an injected collaborator rather than a package-level
//! singleton: the stage resolves the client IP and asks the
//! [`RateLimiter`] on the [`ServiceContext`] whether the request may pass.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota};

use crate::state::ServiceContext;

/// Token-bucket admission keyed by client IP.
///
/// Implementations own their per-IP mutable state and must be safe for
/// concurrent use from any number of in-flight requests.
#[cfg_attr(test, mockall::automock)]
pub trait RateLimiter: Send + Sync {
    /// Whether a request from `ip` may pass right now.
    fn allow(&self, ip: IpAddr) -> bool;
}

/// Default limiter backed by a keyed governor bucket.
pub struct GovernorLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl GovernorLimiter {
    /// Creates a limiter replenishing `per_second` tokens with the given
    /// burst capacity. Zero inputs are clamped to one.
    pub fn new(per_second: u32, burst: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: DefaultKeyedRateLimiter::keyed(
                Quota::per_second(per_second).allow_burst(burst),
            ),
        }
    }
}

impl RateLimiter for GovernorLimiter {
    fn allow(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }
}

/// Resolves the client IP: the first `X-Forwarded-For` entry if present,
/// otherwise the socket peer address. Falls back to the unspecified address
/// when neither is available (in-process test harnesses).
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|s| s.trim().parse().ok())
        .or(peer.map(|p| p.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Consults the limiter for the resolved client IP; on exhaustion responds
/// `429 Too Many Requests` with an empty body and stops the chain.
pub async fn rate_limit(
    State(ctx): State<ServiceContext>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let ip = client_ip(req.headers(), peer);

    if !ctx.limiter.allow(ip) {
        metrics::counter!("requests_rate_limited").increment(1);
        tracing::warn!(%ip, "rate limit exhausted");
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }

    next.run(req).await
}
