//! Browser preflight short-circuit.

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Answers `OPTIONS` requests with `200 OK` immediately so preflights never
/// reach the token stages. The header and CORS stages still stamp the
/// response on its way out.
pub async fn preflight(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(req).await
}
