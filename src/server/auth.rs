//! HTTP Basic authentication for the signing gateway.
//!
//! When credentials are configured, every request must carry
//!
//! ```text
//! Authorization: Basic base64(username:password)
//! ```
//!
//! matching the single static username/password pair. Both halves are
//! compared with constant-time equality so that response timing does not
//! reveal how much of a guess was right.
//!
//! # Example
//!
//! ```rust
//! use sign_server::server::auth::BasicAuth;
//!
//! let auth = BasicAuth::new("signer", "s3cret");
//! assert!(auth.verify_header("Basic c2lnbmVyOnMzY3JldA==").is_ok());
//! assert!(auth.verify_header("Basic c2lnbmVyOndyb25n").is_err());
//! ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};

use super::client_ip::ClientIp;

/// Challenge sent with every 401 response.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="Restricted", charset="UTF-8""#;

/// Authentication error types.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No `Authorization` header, or a scheme other than Basic
    #[error("Missing credentials")]
    MissingCredentials,

    /// Basic payload that is not base64 of `user:password`
    #[error("Malformed credentials")]
    MalformedCredentials,

    /// Well-formed credentials that do not match
    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(BASIC_CHALLENGE),
        );
        response
    }
}

/// Static Basic authentication credentials.
#[derive(Clone)]
pub struct BasicAuth {
    username: Vec<u8>,
    password: Vec<u8>,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BasicAuth {
    /// Create an authenticator accepting exactly this username and password.
    pub fn new(username: impl AsRef<[u8]>, password: impl AsRef<[u8]>) -> Self {
        Self {
            username: username.as_ref().to_vec(),
            password: password.as_ref().to_vec(),
        }
    }

    /// Check a pair of credentials in constant time.
    ///
    /// Both comparisons are always evaluated.
    pub fn verify(&self, username: &[u8], password: &[u8]) -> Result<(), AuthError> {
        let user_ok = username.ct_eq(&self.username);
        let pass_ok = password.ct_eq(&self.password);

        if (user_ok & pass_ok).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Check the raw value of an `Authorization` header.
    pub fn verify_header(&self, value: &str) -> Result<(), AuthError> {
        let (username, password) = parse_basic_authorization(value)?;
        self.verify(username.as_bytes(), password.as_bytes())
    }
}

/// Decode a `Basic` authorization header into `(username, password)`.
///
/// The scheme name is case-insensitive and the password is everything after
/// the first `:`, so it may itself contain colons.
pub fn parse_basic_authorization(value: &str) -> Result<(String, String), AuthError> {
    const PREFIX: &str = "Basic ";

    let payload = match (value.get(..PREFIX.len()), value.get(PREFIX.len()..)) {
        (Some(scheme), Some(payload)) if scheme.eq_ignore_ascii_case(PREFIX) => payload,
        _ => return Err(AuthError::MissingCredentials),
    };

    let decoded = STANDARD
        .decode(payload.trim())
        .map_err(|_| AuthError::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials)?;

    Ok((username.to_string(), password.to_string()))
}

/// Axum middleware rejecting requests without valid Basic credentials.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use sign_server::server::auth::{BasicAuth, basic_auth_middleware};
///
/// let auth = BasicAuth::new("signer", "s3cret");
/// let app = Router::new()
///     .route("/sign", post(sign_handler))
///     .layer(middleware::from_fn_with_state(auth, basic_auth_middleware));
/// ```
pub async fn basic_auth_middleware(
    State(auth): State<BasicAuth>,
    client_ip: ClientIp,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let result = match request.headers().get(header::AUTHORIZATION) {
        None => Err(AuthError::MissingCredentials),
        Some(value) => value
            .to_str()
            .map_err(|_| AuthError::MalformedCredentials)
            .and_then(|v| auth.verify_header(v)),
    };

    if let Err(err) = result {
        match err {
            AuthError::InvalidCredentials => {
                warn!(client_ip = %client_ip, path = %request.uri().path(), "Authentication failed: {}", err)
            }
            _ => {
                debug!(client_ip = %client_ip, path = %request.uri().path(), "Authentication failed: {}", err)
            }
        }
        return Err(err);
    }

    Ok(next.run(request).await)
}
