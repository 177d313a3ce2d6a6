//! HTTP request handlers for the signing API.
//!
//! # Endpoints
//!
//! - `POST /sign` - Upload one or more files under the `file` field, receive
//!   the signed artifact back

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Request, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::signer::Signer;
use crate::upload::{content_disposition, StoredUpload, UploadDir};

use super::client_ip::ClientIp;

/// Multipart field name carrying the files to sign.
pub const FILE_FIELD: &str = "file";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    /// Signs stored uploads in place
    pub signer: Arc<dyn Signer>,

    /// `uploads/` under the working directory
    pub uploads: UploadDir,
}

impl AppState {
    /// Create the state for an absolute working directory and signer.
    pub fn new(work_dir: impl Into<PathBuf>, signer: impl Signer + 'static) -> Self {
        Self::with_signer(work_dir, Arc::new(signer))
    }

    /// Create the state from an already shared signer.
    pub fn with_signer(work_dir: impl Into<PathBuf>, signer: Arc<dyn Signer>) -> Self {
        Self {
            signer,
            uploads: UploadDir::new(&work_dir.into()),
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

impl UploadError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            UploadError::Multipart(_) | UploadError::CreateFile { .. } => StatusCode::BAD_REQUEST,
            UploadError::CreateDir { .. }
            | UploadError::Write { .. }
            | UploadError::Sign(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert UploadError to a plain-text HTTP response.
///
/// 5xx errors are logged at ERROR level, 4xx at WARN.
impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), "Server error: {}", message);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", message);
        }

        (status, message).into_response()
    }
}

fn multipart_error(err: MultipartError) -> UploadError {
    UploadError::Multipart(err.body_text())
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle `POST /sign`.
///
/// The whole multipart body is read first: every `file` part is stored under
/// `uploads/` before anything is signed, so a malformed body never reaches the
/// signer. Stored files are then signed in upload order and the first failure
/// ends the request. Stored files are removed on every path once the request
/// is done.
///
/// The first signed file is served with range and conditional request
/// support. Later files are signed but not returned.
pub async fn sign_handler(
    State(state): State<AppState>,
    client_ip: ClientIp,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, UploadError> {
    info!(client_ip = %client_ip, "Signature request received");

    let multipart = multipart.map_err(|e| UploadError::Multipart(e.body_text()))?;
    let stored = store_parts(&state, &client_ip, multipart).await?;

    for upload in &stored {
        state.signer.sign(upload.path()).await?;
        info!(client_ip = %client_ip, file = %upload.basename(), "Signed upload");
    }

    match stored.first() {
        None => Ok(StatusCode::OK.into_response()),
        Some(first) => {
            if stored.len() > 1 {
                debug!(
                    client_ip = %client_ip,
                    files = stored.len(),
                    "Returning first signed file only"
                );
            }
            Ok(serve_artifact(first, &headers).await)
        }
    }
}

/// Store every `file` part that carries a filename, in upload order.
///
/// Fails on the first malformed part; files stored so far are removed when
/// the returned guards are dropped.
async fn store_parts(
    state: &AppState,
    client_ip: &ClientIp,
    mut multipart: Multipart,
) -> Result<Vec<StoredUpload>, UploadError> {
    let mut stored = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => continue,
        };

        state.uploads.ensure().await?;
        let mut pending = state.uploads.create(&file_name).await?;

        let mut size = 0usize;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len();
            pending.write(&chunk).await?;
        }
        let upload = pending.finish().await?;

        debug!(
            client_ip = %client_ip,
            file = %upload.basename(),
            path = %upload.path().display(),
            bytes = size,
            "Stored upload"
        );
        stored.push(upload);
    }

    Ok(stored)
}

/// Reject any method other than POST on `/sign`.
pub async fn method_not_allowed_handler(client_ip: ClientIp) -> UploadError {
    info!(client_ip = %client_ip, "Signature request received");
    UploadError::MethodNotAllowed
}

// =============================================================================
// Response Helpers
// =============================================================================

async fn serve_artifact(stored: &StoredUpload, headers: &HeaderMap) -> Response {
    // Only range and conditional headers matter to the file responder.
    let mut request = Request::new(Body::empty());
    for name in [
        header::RANGE,
        header::IF_RANGE,
        header::IF_MODIFIED_SINCE,
        header::IF_UNMODIFIED_SINCE,
        header::IF_NONE_MATCH,
    ] {
        if let Some(value) = headers.get(&name) {
            request.headers_mut().insert(name, value.clone());
        }
    }

    let response = match ServeFile::new(stored.path()).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    set_attachment_headers(response.headers_mut(), stored.basename());
    response
}

fn set_attachment_headers(headers: &mut HeaderMap, name: &str) {
    let disposition = HeaderValue::from_bytes(content_disposition(name).as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
}

// =============================================================================
// Tests
// =============================================================================
