//! Authentication integration tests.
//!
//! Tests verify:
//! - Valid Basic credentials reach the handler
//! - Wrong, missing and malformed credentials get 401 with a challenge
//! - The signer is never invoked for rejected requests
//! - Authentication covers every path, not just /sign

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tower::ServiceExt;

use sign_server::server::auth::BASIC_CHALLENGE;
use sign_server::{BasicAuth, RouterConfig};

use super::test_utils::{
    body_bytes, body_text, multipart_body, sign_request, sign_request_builder, signed, MockSigner,
    Part, TestServer,
};

const USERNAME: &str = "signer";
const PASSWORD: &str = "correct horse battery staple";

fn authenticated_server(signer: MockSigner) -> TestServer {
    TestServer::new(
        signer,
        RouterConfig::new().with_auth(BasicAuth::new(USERNAME, PASSWORD)),
    )
}

fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
}

fn signed_upload_with_auth(authorization: &str) -> Request<Body> {
    sign_request_builder()
        .header(header::AUTHORIZATION, authorization)
        .body(Body::from(multipart_body(&[Part::file("app.apk", b"apk")])))
        .unwrap()
}

async fn assert_unauthorized(response: axum::http::Response<Body>) {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        BASIC_CHALLENGE
    );
    assert_eq!(body_text(response).await, "Unauthorized");
}

// =============================================================================
// Valid Credentials
// =============================================================================

#[tokio::test]
async fn test_valid_credentials_succeed() {
    let signer = MockSigner::new();
    let server = authenticated_server(signer.clone());

    let response = server
        .router
        .clone()
        .oneshot(signed_upload_with_auth(&basic(USERNAME, PASSWORD)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, signed(b"apk"));
    assert_eq!(signer.call_count(), 1);
}

#[tokio::test]
async fn test_open_mode_needs_no_credentials() {
    let signer = MockSigner::new();
    let server = TestServer::open(signer.clone());

    let response = server
        .router
        .clone()
        .oneshot(sign_request(&[Part::file("app.apk", b"apk")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(signer.call_count(), 1);
}

// =============================================================================
// Rejected Credentials
// =============================================================================

#[tokio::test]
async fn test_missing_credentials_rejected() {
    let signer = MockSigner::new();
    let server = authenticated_server(signer.clone());

    let response = server
        .router
        .clone()
        .oneshot(sign_request(&[Part::file("app.apk", b"apk")]))
        .await
        .unwrap();

    assert_unauthorized(response).await;
    assert_eq!(signer.call_count(), 0);
    assert!(server.leftover_uploads().is_empty());
}

#[tokio::test]
async fn test_wrong_credentials_rejected() {
    let signer = MockSigner::new();
    let server = authenticated_server(signer.clone());

    for authorization in [
        basic(USERNAME, "wrong"),
        basic("admin", PASSWORD),
        basic(USERNAME, &PASSWORD[..PASSWORD.len() - 1]),
        basic("", ""),
    ] {
        let response = server
            .router
            .clone()
            .oneshot(signed_upload_with_auth(&authorization))
            .await
            .unwrap();
        assert_unauthorized(response).await;
    }

    assert_eq!(signer.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_credentials_rejected() {
    let signer = MockSigner::new();
    let server = authenticated_server(signer.clone());

    let no_colon = format!("Basic {}", STANDARD.encode(USERNAME));
    for authorization in [
        "Basic",
        "Basic !!!",
        no_colon.as_str(),
        "Bearer some-token",
    ] {
        let response = server
            .router
            .clone()
            .oneshot(signed_upload_with_auth(authorization))
            .await
            .unwrap();
        assert_unauthorized(response).await;
    }

    assert_eq!(signer.call_count(), 0);
}

// =============================================================================
// Coverage of Other Routes
// =============================================================================

#[tokio::test]
async fn test_auth_checked_before_method() {
    let signer = MockSigner::new();
    let server = authenticated_server(signer.clone());

    let request = Request::builder()
        .method("GET")
        .uri("/sign")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_unauthorized(response).await;

    let request = Request::builder()
        .method("GET")
        .uri("/sign")
        .header(header::AUTHORIZATION, basic(USERNAME, PASSWORD))
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_path_requires_auth() {
    let signer = MockSigner::new();
    let server = authenticated_server(signer.clone());

    let request = Request::builder()
        .uri("/admin")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_unauthorized(response).await;

    let request = Request::builder()
        .uri("/admin")
        .header(header::AUTHORIZATION, basic(USERNAME, PASSWORD))
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
