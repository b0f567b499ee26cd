//! Authentication middleware integration tests.
//!
//! Drives an axum router protected by `require_auth` with `oneshot` requests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::{middleware, Extension, Router};
use http_body_util::BodyExt;
use realm_gate::middleware::{require_auth, AuthState, ClaimsExt};
use realm_gate::{Claims, TokenVerifier};
use realm_gate_test_utils::{init_test_tracing, test_signing_key, MockJwksServer, TestTokenBuilder};
use std::sync::Arc;
use tower::ServiceExt;

const REALM: &str = "reports";

async fn whoami(Extension(claims): Extension<Claims>) -> String {
    claims.subject().unwrap_or("anonymous").to_string()
}

async fn roles(req: Request) -> String {
    req.claims()
        .map(|claims| claims.realm_roles().join(","))
        .unwrap_or_default()
}

fn app(server: &MockJwksServer) -> Router {
    let state = Arc::new(AuthState::new(Arc::new(TokenVerifier::from_config(
        &server.config(),
    ))));

    Router::new()
        .route("/whoami", get(whoami))
        .route("/roles", get(roles))
        .layer(middleware::from_fn_with_state(state, require_auth))
}

fn request(uri: &str, authorization: Option<&str>) -> Request {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_valid_bearer_token_reaches_handler() -> Result<()> {
    init_test_tracing();
    let key = test_signing_key(1)?;
    let server = MockJwksServer::start(REALM, &[&key]).await;
    let token = TestTokenBuilder::new().for_user("alice").sign_with(&key)?;

    let response = app(&server)
        .oneshot(request("/whoami", Some(&format!("Bearer {token}"))))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "alice");
    Ok(())
}

#[tokio::test]
async fn test_claims_ext_exposes_roles() -> Result<()> {
    init_test_tracing();
    let key = test_signing_key(1)?;
    let server = MockJwksServer::start(REALM, &[&key]).await;
    let token = TestTokenBuilder::new()
        .with_realm_role("reports:read")
        .with_realm_role("reports:export")
        .sign_with(&key)?;

    let response = app(&server)
        .oneshot(request("/roles", Some(&format!("Bearer {token}"))))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response.into_body()).await,
        "reports:read,reports:export"
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_or_foreign_credentials_skip_verification() -> Result<()> {
    init_test_tracing();
    let key = test_signing_key(1)?;
    let server = MockJwksServer::start(REALM, &[&key]).await;
    let token = TestTokenBuilder::new().sign_with(&key)?;

    let cases = [
        None,
        Some("Basic dXNlcjpwYXNz".to_string()),
        Some(format!("bearer {token}")),
        Some(token.clone()),
        Some("Bearer ".to_string()),
    ];

    for authorization in cases {
        let response = app(&server)
            .oneshot(request("/whoami", authorization.as_deref()))
            .await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{authorization:?}");
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    assert_eq!(server.fetch_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_rejections_are_indistinguishable() -> Result<()> {
    init_test_tracing();
    let key1 = test_signing_key(1)?;
    let key2 = test_signing_key(2)?;
    let server = MockJwksServer::start(REALM, &[&key1]).await;

    let bad_signature = TestTokenBuilder::new()
        .with_kid(&key1.kid)
        .sign_with(&key2)?;
    let unknown_kid = TestTokenBuilder::new().sign_with(&key2)?;

    let mut bodies = Vec::new();
    for authorization in [
        None,
        Some(format!("Bearer {bad_signature}")),
        Some(format!("Bearer {unknown_kid}")),
        Some("Bearer not-a-token".to_string()),
    ] {
        let response = app(&server)
            .oneshot(request("/whoami", authorization.as_deref()))
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        bodies.push(body_string(response.into_body()).await);
    }

    bodies.dedup();
    assert_eq!(bodies.len(), 1, "every rejection must look the same: {bodies:?}");
    Ok(())
}

#[tokio::test]
async fn test_provider_outage_is_unauthorized() -> Result<()> {
    init_test_tracing();
    let key = test_signing_key(1)?;
    let server = MockJwksServer::start_failing(REALM, 502).await;
    let token = TestTokenBuilder::new().sign_with(&key)?;

    let response = app(&server)
        .oneshot(request("/whoami", Some(&format!("Bearer {token}"))))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
