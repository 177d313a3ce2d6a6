//! End-to-end tests with a real signing script.
//!
//! Tests verify:
//! - The script signs the stored file in place and the result is returned
//! - A failing script yields 500 without leaking its output to the client
//! - The failing script's output is written to the server log
//! - A hung script is killed after the timeout

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use tower::ServiceExt;

use sign_server::{create_router, AppState, RouterConfig, ScriptSigner, UPLOADS_DIR};

use super::test_utils::{body_bytes, body_text, sign_request, Part};

fn install_script(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("sign.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn script_router(dir: &Path, script: std::path::PathBuf, timeout: Duration) -> axum::Router {
    let signer = ScriptSigner::new(script).with_timeout(timeout);
    let state = AppState::new(dir, signer);
    create_router(state, RouterConfig::new().with_tracing(false))
}

/// Log output collected by a test-local subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn uploads_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir.join(UPLOADS_DIR))
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[tokio::test]
async fn test_script_signs_upload() {
    let dir = tempfile::TempDir::new().unwrap();
    let script = install_script(dir.path(), r#"printf '%s' '-signed' >> "$1""#);
    let router = script_router(dir.path(), script, Duration::from_secs(30));

    let response = router
        .oneshot(sign_request(&[Part::file("app.apk", b"apk")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"apk-signed");
    assert!(uploads_empty(dir.path()));
}

#[tokio::test]
async fn test_failing_script_output_stays_in_logs() {
    let dir = tempfile::TempDir::new().unwrap();
    let script = install_script(dir.path(), "echo 'keystore password rejected'; exit 1");
    let router = script_router(dir.path(), script, Duration::from_secs(30));

    let response = router
        .oneshot(sign_request(&[Part::file("app.apk", b"apk")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert_eq!(body, "exit status: 1");
    assert!(!body.contains("keystore"));
    assert!(uploads_empty(dir.path()));
}

#[tokio::test]
async fn test_failing_script_output_is_logged() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::TempDir::new().unwrap();
    let script = install_script(
        dir.path(),
        "echo 'keystore password rejected'; echo 'on stderr' >&2; exit 1",
    );
    let router = script_router(dir.path(), script, Duration::from_secs(30));

    let response = router
        .oneshot(sign_request(&[Part::file("app.apk", b"apk")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let logged = logs.contents();
    assert!(logged.contains("Sign script failed"), "log was: {logged}");
    assert!(logged.contains("keystore password rejected"), "log was: {logged}");
    assert!(logged.contains("on stderr"), "log was: {logged}");
}

#[tokio::test]
async fn test_missing_script_is_internal_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let router = script_router(
        dir.path(),
        dir.path().join("sign.sh"),
        Duration::from_secs(30),
    );

    let response = router
        .oneshot(sign_request(&[Part::file("app.apk", b"apk")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(uploads_empty(dir.path()));
}

#[tokio::test]
async fn test_hung_script_times_out() {
    let dir = tempfile::TempDir::new().unwrap();
    let script = install_script(dir.path(), "sleep 10");
    let router = script_router(dir.path(), script, Duration::from_millis(300));

    let response = router
        .oneshot(sign_request(&[Part::file("app.apk", b"apk")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "signing timed out after 300ms");
    assert!(uploads_empty(dir.path()));
}
