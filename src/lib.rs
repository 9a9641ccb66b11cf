//! # Chassis
//!
//! The authenticated request-processing core of a backend service, built
//! with Axum and PostgreSQL.
//!
//! ## Architecture
//!
//! - **Admission** ([`middleware`]) - ordered stages deciding whether a
//!   request passes: headers, CORS, rate limit, IP allow-list, preflight,
//!   token validation, permission check
//! - **Tokens** ([`auth`]) - HS256 token issuance and validation
//! - **Envelope** ([`envelope`]) - the symmetric `{"data": ...}` body codec
//!   and the only response writers
//! - **Data** ([`db`]) - primary/replica routing with per-pool time budgets
//!   and the one-time schema runner
//! - **Context** ([`state`]) - the process-wide [`state::ServiceContext`]
//!   holding configuration, the token authority, the codec, the pools and
//!   the external collaborators
//! - **Listener** ([`server`]) - pipeline assembly over plain HTTP or
//!   mutual TLS
//!
//! ## Quick Start
//!
//! ```bash
//! # Set required environment variables
//! export JWT_SECRET="..."
//! export ENVELOPE_SECRET="..."
//! export DB_PRIMARY_HOST=... DB_PRIMARY_USER=... DB_PRIMARY_PASSWORD=... DB_PRIMARY_NAME=...
//! export DB_REPLICA_HOST=... DB_REPLICA_USER=... DB_REPLICA_PASSWORD=... DB_REPLICA_NAME=...
//!
//! # Start the demo service
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via
//! [`config::Config`]. See the [`config`] module for the full list.

pub mod auth;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod server;
pub mod state;
pub mod tls;

pub use error::AppError;
pub use state::ServiceContext;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::auth::{AuthToken, TokenAuthority};
    pub use crate::db::{Database, DbError};
    pub use crate::envelope::{EnvelopeCodec, respond};
    pub use crate::error::AppError;
    pub use crate::server::{ServiceRoutes, build_router};
    pub use crate::state::ServiceContext;
}
