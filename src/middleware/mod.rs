//! Request admission stages and their composition.
//!
//! Each stage is an `axum::middleware::from_fn` function that either stops
//! the chain with a response or forwards to the next stage. Stages are
//! composed with [`tower::ServiceBuilder`], which applies layers top-down:
//! **the first stage listed runs first on an inbound request** and last on
//! the outbound response. The stage order at the call sites below is
//! therefore the execution order; there is no reversed-fold composition to
//! reason about.
//!
//! Stage order for protected routes:
//!
//! 1. [`headers`] - response content-type and allowed methods/headers
//! 2. [`cors`] - allowed-origin echo (wildcard outside the allow-list)
//! 3. [`rate_limit`] - per-IP token bucket, `429` on exhaustion
//! 4. [`ip_allow`] - client IP allow-list, `403` on miss
//! 5. [`preflight`] - `OPTIONS` short-circuit, `200`
//! 6. [`authenticate`] - token validation, `401` with encrypted envelope
//! 7. [`check_permission`] - path check against token permissions, `401`
//!
//! Open routes run stages 1-5 plus [`passthrough`]. Preflight sits before
//! authentication so browser preflights never need a token; it sits after
//! the rate and IP checks, which therefore apply to `OPTIONS` as well.

pub mod auth;
pub mod cors;
pub mod headers;
pub mod ip_allow;
pub mod preflight;
pub mod rate_limit;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use tower::ServiceBuilder;

use crate::state::ServiceContext;

pub use auth::{authenticate, check_permission, passthrough};
pub use cors::cors;
pub use headers::headers;
pub use ip_allow::ip_allow;
pub use preflight::preflight;
pub use rate_limit::{GovernorLimiter, RateLimiter, client_ip};

/// Wraps routes that require a valid token and permission check.
pub fn protected(
    routes: Router<ServiceContext>,
    ctx: &ServiceContext,
) -> Router<ServiceContext> {
    routes.layer(
        ServiceBuilder::new()
            .layer(from_fn(headers))
            .layer(from_fn_with_state(ctx.clone(), cors))
            .layer(from_fn_with_state(ctx.clone(), rate_limit::rate_limit))
            .layer(from_fn_with_state(ctx.clone(), ip_allow))
            .layer(from_fn(preflight))
            .layer(from_fn_with_state(ctx.clone(), authenticate))
            .layer(from_fn_with_state(ctx.clone(), check_permission)),
    )
}

/// Wraps routes exempt from authentication. The admission stages still
/// apply; only the token stages are replaced by [`passthrough`].
pub fn open(routes: Router<ServiceContext>, ctx: &ServiceContext) -> Router<ServiceContext> {
    routes.layer(
        ServiceBuilder::new()
            .layer(from_fn(headers))
            .layer(from_fn_with_state(ctx.clone(), cors))
            .layer(from_fn_with_state(ctx.clone(), rate_limit::rate_limit))
            .layer(from_fn_with_state(ctx.clone(), ip_allow))
            .layer(from_fn(preflight))
            .layer(from_fn(passthrough)),
    )
}
