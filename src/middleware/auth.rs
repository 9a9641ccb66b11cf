//! Token validation and permission stages.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::envelope::respond;
use crate::error::AppError;
use crate::state::ServiceContext;

/// Validates the request token; on failure responds `401 Unauthorized` with
/// an encrypted error envelope and stops the chain.
pub async fn authenticate(
    State(ctx): State<ServiceContext>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(error) = ctx.tokens.validate(req.uri(), req.headers()) {
        metrics::counter!("requests_auth_failed").increment(1);
        tracing::warn!(path = req.uri().path(), error = %error, "authentication failed");
        return respond::failure(&ctx.envelope, &error);
    }

    next.run(req).await
}

/// Decodes the token and checks the request path against its permission
/// list. A path that appears in the list is refused with `401`; only paths
/// absent from the list pass. Tokens must be provisioned accordingly; the
/// polarity is pinned by tests and must not be flipped here.
///
/// On success the decoded [`crate::auth::AuthToken`] is inserted into
/// request extensions for downstream handlers.
pub async fn check_permission(
    State(ctx): State<ServiceContext>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match ctx.tokens.decode(req.uri(), req.headers()) {
        Ok(token) => token,
        Err(error) => {
            tracing::warn!(path = req.uri().path(), error = %error, "token decode failed");
            return respond::failure(&ctx.envelope, &error);
        }
    };

    let path = req.uri().path();
    if token.permissions.iter().any(|p| p == path) {
        metrics::counter!("requests_permission_denied").increment(1);
        tracing::warn!(path, user_id = token.user_id, "path refused by permission list");
        return respond::failure(&ctx.envelope, &AppError::PermissionDenied);
    }

    req.extensions_mut().insert(token);
    next.run(req).await
}

/// No-op stage for routes explicitly exempted from authentication.
pub async fn passthrough(req: Request, next: Next) -> Response {
    next.run(req).await
}
