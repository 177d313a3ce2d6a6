//! Router configuration for the signing gateway.
//!
//! # Route Structure
//!
//! ```text
//! POST /sign      - Upload and sign (Basic auth when configured)
//! *    /sign      - 405 Method not allowed
//! *    (other)    - 404 Not Found
//! ```
//!
//! When authentication is configured it wraps the whole router, including the
//! 404 fallback, so unauthenticated callers only ever see 401.
//!
//! # Example
//!
//! ```ignore
//! use sign_server::server::{create_router, AppState, BasicAuth, RouterConfig};
//! use sign_server::signer::ScriptSigner;
//!
//! let state = AppState::new("/srv/sign", ScriptSigner::new("/srv/sign/sign.sh"));
//! let config = RouterConfig::new().with_auth(BasicAuth::new("signer", "s3cret"));
//! let router = create_router(state, config);
//! ```

use axum::{extract::DefaultBodyLimit, middleware, routing::post, Router};
use tower_http::trace::TraceLayer;

use super::auth::{basic_auth_middleware, BasicAuth};
use super::handlers::{method_not_allowed_handler, sign_handler, AppState};

/// Default maximum request body size (1 GiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 1024 << 20;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Credentials required on every request; `None` runs the gateway open
    pub auth: Option<BasicAuth>,

    /// Maximum accepted request body size in bytes
    pub max_upload_size: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create an open (unauthenticated) configuration.
    ///
    /// By default:
    /// - Authentication is disabled
    /// - Uploads up to 1 GiB are accepted
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            auth: None,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            enable_tracing: true,
        }
    }

    /// Require these Basic credentials on every request.
    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the maximum accepted request body size.
    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    let router = Router::new()
        .route(
            "/sign",
            post(sign_handler).fallback(method_not_allowed_handler),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_size))
        .with_state(state);

    let router = match config.auth {
        Some(auth) => router.layer(middleware::from_fn_with_state(auth, basic_auth_middleware)),
        None => router,
    };

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

// =============================================================================
// Tests
// =============================================================================
