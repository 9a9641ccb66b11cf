mod common;

use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::{Json, Router};
use axum_test::TestServer;
use serde_json::{Value, json};
use tower::ServiceBuilder;

use chassis::auth::TokenAuthority;
use chassis::config::JwtConfig;
use chassis::middleware::{ip_allow, preflight};
use chassis::server::{ServiceRoutes, build_router};
use chassis::state::ServiceContext;

use common::{ALLOWED_IP, ALLOWED_ORIGIN, AllowAll, DenyAll};

async fn pong() -> Json<Value> {
    Json(json!({ "pong": true }))
}

fn routes() -> ServiceRoutes {
    ServiceRoutes {
        protected: Router::new().route("/notes", get(pong)),
        open: Router::new().route("/ping", get(pong)),
    }
}

fn server(ctx: ServiceContext) -> TestServer {
    TestServer::new(build_router(ctx, routes())).unwrap()
}

fn decrypt_error(ctx: &ServiceContext, body: &[u8]) -> Value {
    let plain = ctx.envelope.unwrap(body).unwrap();
    serde_json::from_slice(&plain).unwrap()
}

#[tokio::test]
async fn options_short_circuits_before_authentication() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let server = server(ctx);

    let response = server
        .method(axum::http::Method::OPTIONS, "/notes")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn options_is_still_subject_to_the_ip_allow_list() {
    // In the default stage order the IP check runs before preflight.
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let server = server(ctx);

    let response = server
        .method(axum::http::Method::OPTIONS, "/notes")
        .add_header("x-forwarded-for", "9.9.9.9")
        .await;

    response.assert_status(axum::http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn options_passes_a_rejecting_ip_check_when_preflight_runs_first() {
    // An explicit stack with preflight ahead of the IP stage: the
    // short-circuit wins even for a client the allow-list would reject.
    let ctx = common::test_context();
    let app = Router::new()
        .route("/anything", get(pong))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(preflight))
                .layer(from_fn_with_state(ctx.clone(), ip_allow)),
        );
    let server = TestServer::new(app).unwrap();

    let response = server
        .method(axum::http::Method::OPTIONS, "/anything")
        .add_header("x-forwarded-for", "9.9.9.9")
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn listed_origin_is_echoed_back() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let server = server(ctx);

    let response = server
        .get("/ping")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .add_header("origin", ALLOWED_ORIGIN)
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("access-control-allow-origin"),
        ALLOWED_ORIGIN
    );
}

#[tokio::test]
async fn unlisted_origin_gets_the_wildcard() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let server = server(ctx);

    let response = server
        .get("/ping")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .add_header("origin", "https://evil.example")
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("access-control-allow-origin"), "*");
}

#[tokio::test]
async fn fixed_headers_are_stamped_on_every_response() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let server = server(ctx);

    let response = server
        .get("/ping")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/json");
    assert_eq!(
        response.header("access-control-allow-methods"),
        "POST, GET, OPTIONS, PUT, DELETE"
    );
}

#[tokio::test]
async fn exhausted_limiter_answers_429() {
    let ctx = common::test_context().with_limiter(Arc::new(DenyAll));
    let server = server(ctx);

    let response = server
        .get("/ping")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .await;

    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn unlisted_client_ip_answers_403() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let server = server(ctx);

    let response = server
        .get("/ping")
        .add_header("x-forwarded-for", "203.0.113.50")
        .await;

    response.assert_status(axum::http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_token_answers_encrypted_401() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let server = server(ctx.clone());

    let response = server
        .get("/notes")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .await;

    response.assert_status_unauthorized();
    let body = decrypt_error(&ctx, response.as_bytes());
    assert_eq!(body["error"], "authentication token is missing");
}

#[tokio::test]
async fn expired_token_answers_401() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let expired_authority = TokenAuthority::new(&JwtConfig {
        secret: "test-jwt-secret".to_string(),
        authorized: true,
        minutes: -5,
    });
    let token = expired_authority.issue(7, "user", vec![]).unwrap();
    let server = server(ctx);

    let response = server
        .get("/notes")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .add_header("authorization", format!("Bearer {token}"))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn token_without_the_path_in_its_permissions_passes() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let token = ctx
        .tokens
        .issue(7, "user", vec!["/admin".to_string()])
        .unwrap();
    let server = server(ctx);

    let response = server
        .get("/notes")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .add_header("authorization", format!("Bearer {token}"))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn token_listing_the_path_is_refused() {
    // The permission list names the paths a token is refused on; pinned
    // observable behavior.
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let token = ctx
        .tokens
        .issue(7, "user", vec!["/notes".to_string()])
        .unwrap();
    let server = server(ctx.clone());

    let response = server
        .get("/notes")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .add_header("authorization", format!("Bearer {token}"))
        .await;

    response.assert_status_unauthorized();
    let body = decrypt_error(&ctx, response.as_bytes());
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn query_parameter_token_wins_over_the_header() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let valid = ctx.tokens.issue(7, "user", vec![]).unwrap();
    let server = server(ctx);

    let response = server
        .get(&format!("/notes?jwt={valid}"))
        .add_header("x-forwarded-for", ALLOWED_IP)
        .add_header("authorization", "Bearer not-a-token")
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn a_bad_query_parameter_token_is_not_rescued_by_the_header() {
    let ctx = common::test_context().with_limiter(Arc::new(AllowAll));
    let valid = ctx.tokens.issue(7, "user", vec![]).unwrap();
    let server = server(ctx);

    let response = server
        .get("/notes?jwt=not-a-token")
        .add_header("x-forwarded-for", ALLOWED_IP)
        .add_header("authorization", format!("Bearer {valid}"))
        .await;

    response.assert_status_unauthorized();
}
