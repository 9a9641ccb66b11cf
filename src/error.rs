//! Request-level error taxonomy and status mappings.
//!
//! Every recoverable failure a request can hit maps to exactly one variant
//! and one HTTP status. Authentication and payload errors leave the process
//! as encrypted envelopes written by [`crate::envelope::respond`]; rate-limit
//! and IP rejections answer with a bare status and empty body.
//!
//! Startup failures do not live here: initialization paths return
//! `anyhow::Result` with context and are unwrapped only in `main`, which
//! alone decides process termination.

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::db::DbError;

/// Errors produced while admitting or serving a single request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No token in the `jwt` query parameter or the `Authorization` header.
    #[error("authentication token is missing")]
    MissingToken,

    /// Token failed signature or expiry checks.
    #[error("authentication token is invalid or expired")]
    InvalidToken,

    /// Token decoded but a claim is absent or of the wrong shape.
    #[error("token claims are malformed: {0}")]
    MalformedClaims(String),

    /// The request path was refused by the permission check.
    #[error("Unauthorized")]
    PermissionDenied,

    /// Token signer is misconfigured (empty secret).
    #[error("token signer is misconfigured")]
    Signing,

    /// Per-IP token bucket is exhausted.
    #[error("too many requests")]
    RateLimited,

    /// Client IP is not in the configured allow-list.
    #[error("forbidden")]
    IpForbidden,

    /// Body is not a valid envelope or could not be decrypted.
    #[error("bad payload: {0}")]
    BadPayload(String),

    /// A data operation exceeded its pool budget.
    #[error("operation exceeded its time budget")]
    Deadline,

    /// Anything the client cannot act on.
    #[error("internal error")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::InvalidToken
            | Self::MalformedClaims(_)
            | Self::PermissionDenied => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::IpForbidden => StatusCode::FORBIDDEN,
            Self::BadPayload(_) => StatusCode::BAD_REQUEST,
            Self::Signing | Self::Deadline | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing error body. Encrypted before it leaves the process;
    /// `Internal` deliberately carries no detail.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Internal(_) => json!({ "error": "internal error" }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DeadlineExceeded { .. } => Self::Deadline,
            other => Self::Internal(other.to_string()),
        }
    }
}
