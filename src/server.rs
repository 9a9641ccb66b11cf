//! HTTP server initialization and runtime setup.
//!
//! Pulls the pieces together: connects the pools, runs the one-time schema
//! step, assembles the middleware stacks around the caller's routes and
//! binds the listener — plain HTTP in development, mutual TLS in
//! production.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::{Router, ServiceExt};
use axum_server::tls_rustls::RustlsConfig;
use tower::Layer;
use tower_http::LatencyUnit;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::{Config, Environment};
use crate::db::Database;
use crate::middleware;
use crate::state::ServiceContext;

/// The caller's route handlers, split by admission requirements.
///
/// `protected` routes run the full stage set including token validation and
/// the permission check; `open` routes run the admission stages only.
pub struct ServiceRoutes {
    pub protected: Router<ServiceContext>,
    pub open: Router<ServiceContext>,
}

/// Runs the server with the given configuration and routes.
///
/// Initializes, in order:
/// - primary and replica connection pools (lazy)
/// - one-time schema execution against the primary, when enabled
/// - the shared [`ServiceContext`]
/// - the middleware stacks and listener
///
/// # Errors
///
/// Returns an error if schema execution or the listener fails; the caller
/// (normally `main`) decides process termination.
pub async fn run(config: Config, routes: ServiceRoutes) -> Result<()> {
    let db = Database::connect(&config.primary, &config.replica);
    tracing::info!(
        primary = %config.primary.redacted_url(),
        replica = %config.replica.redacted_url(),
        "database pools ready"
    );

    db.execute_schema(&config.primary)
        .await
        .context("schema execution failed")?;

    let ctx = ServiceContext::new(Arc::new(config), Arc::new(db));
    serve(ctx, routes).await
}

/// Binds the listener and serves the assembled router. Split from [`run`]
/// so embedders can inject real collaborators into the context first.
pub async fn serve(ctx: ServiceContext, routes: ServiceRoutes) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], ctx.config.server.port));
    let environment = ctx.config.environment;
    let tls = ctx.config.tls.clone();

    let app = NormalizePathLayer::trim_trailing_slash().layer(build_router(ctx, routes));
    let service = ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app);

    match environment {
        Environment::Production => {
            let tls = tls.context("production requires TLS material")?;
            let rustls = RustlsConfig::from_config(Arc::new(crate::tls::server_config(&tls)?));
            tracing::info!(%addr, "listening with mutual TLS");
            axum_server::bind_rustls(addr, rustls)
                .serve(service)
                .await
                .context("server error")?;
        }
        Environment::Development => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            tracing::info!(%addr, "listening on plain HTTP");
            axum::serve(listener, service).await.context("server error")?;
        }
    }

    Ok(())
}

/// Assembles the full router: both stacks merged, request timeout and
/// tracing applied, state attached.
pub fn build_router(ctx: ServiceContext, routes: ServiceRoutes) -> Router {
    let protected = middleware::protected(routes.protected, &ctx);
    let open = middleware::open(routes.open, &ctx);
    let timeout = Duration::from_secs(ctx.config.server.timeout_secs);

    Router::new()
        .merge(protected)
        .merge(open)
        .with_state(ctx)
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
}
