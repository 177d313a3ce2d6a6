//! # Sign Server
//!
//! A small HTTPS service that signs uploaded files.
//!
//! Clients `POST` a `multipart/form-data` body with one or more `file` parts
//! to `/sign`. Each file is stored under `uploads/` and handed to a signer (by
//! default an external `sign.sh` script). The first signed file is streamed
//! back. Stored files are always removed when the request ends.
//!
//! ## Features
//!
//! - **TLS**: served with rustls through `axum-server`
//! - **Optional Basic auth**: a single static username/password pair,
//!   compared in constant time
//! - **Pluggable signing**: the [`signer::Signer`] trait decouples the handler
//!   from the script, and the script is run under a timeout
//! - **Path traversal safe**: client filenames are reduced to their base name
//!
//! ## Architecture
//!
//! - [`server`] - Axum router, Basic auth middleware, handlers and TLS loading
//! - [`signer`] - Signer trait and the external script implementation
//! - [`upload`] - Unique temporary storage with drop-based cleanup
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use sign_server::{create_router, AppState, RouterConfig, ScriptSigner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new("/srv/sign", ScriptSigner::new("/srv/sign/sign.sh"));
//!     let router = create_router(state, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod signer;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use error::{SignError, UploadError};
pub use server::{
    basic_auth_middleware, client_ip, create_router, load_tls_config, sign_handler, AppState,
    AuthError, BasicAuth, ClientIp, RouterConfig, DEFAULT_MAX_UPLOAD_SIZE, FILE_FIELD,
};
pub use signer::{ScriptSigner, Signer, DEFAULT_SIGN_TIMEOUT};
pub use upload::{sanitize_filename, StoredUpload, UploadDir, UPLOADS_DIR};
