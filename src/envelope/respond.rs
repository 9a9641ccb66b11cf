//! Response writers: the only paths that put bodies on the wire.
//!
//! Success and failure bodies alike are encrypted envelopes; raw error text
//! is never sent unencrypted. Bare-status rejections (429, 403) do not go
//! through here, they carry no body at all.

use axum::body::Bytes;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::envelope::EnvelopeCodec;
use crate::error::AppError;

/// Writes a successful response: plaintext sealed into an envelope.
///
/// Falls back to a bare 500 if sealing itself fails, since there is no safe
/// body to send at that point.
pub fn success(codec: &EnvelopeCodec, status: StatusCode, plaintext: &[u8]) -> Response {
    match codec.wrap(plaintext) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to seal response envelope");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Writes an error response: the error's client-facing JSON, encrypted,
/// under the error's fixed status.
pub fn failure(codec: &EnvelopeCodec, error: &AppError) -> Response {
    let body = error.to_json().to_string();
    success(codec, error.status(), body.as_bytes())
}

/// Recovers the plaintext request payload from a raw body.
///
/// On any envelope failure the caller gets a ready-to-return 400 response;
/// handlers use this as their first step:
///
/// ```rust,ignore
/// async fn echo(State(ctx): State<ServiceContext>, body: Bytes) -> Response {
///     let plaintext = match respond::payload(&ctx.envelope, &body) {
///         Ok(p) => p,
///         Err(rejection) => return rejection,
///     };
///     // ... work with plaintext ...
/// }
/// ```
pub fn payload(codec: &EnvelopeCodec, raw: &Bytes) -> Result<Vec<u8>, Response> {
    codec.unwrap(raw).map_err(|e| failure(codec, &e))
}
