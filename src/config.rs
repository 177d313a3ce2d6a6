//! Configuration management for the signing gateway.
//!
//! Options come from command-line arguments, environment variables with the
//! `SIGN_` prefix, and an optional `.env` file loaded before parsing.
//!
//! # Environment Variables
//!
//! - `SIGN_HOST` - Server bind address (default: 0.0.0.0)
//! - `SIGN_PORT` - Server port (default: 443)
//! - `SIGN_BASE_DIR` - Working directory (default: directory of the executable)
//! - `SIGN_TLS_CERT` / `SIGN_TLS_KEY` - PEM files (default: cert/cert.pem, cert/key.pem)
//! - `SIGN_SCRIPT` - Signing executable (default: sign.sh)
//! - `SIGN_TIMEOUT` - Signing timeout in seconds (default: 300)
//! - `SIGN_MAX_UPLOAD_SIZE` - Maximum request body in bytes (default: 1 GiB)
//! - `SIGN_USERNAME` / `SIGN_PASSWORD` - Basic auth credentials (both or neither)
//! - `SIGN_REQUIRE_AUTH` - Refuse to start without credentials (default: false)
//!
//! Relative paths are resolved against the working directory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::server::{BasicAuth, DEFAULT_MAX_UPLOAD_SIZE};
use crate::signer::DEFAULT_SIGN_TIMEOUT;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 443;

/// Default TLS certificate path.
pub const DEFAULT_CERT_PATH: &str = "cert/cert.pem";

/// Default TLS private key path.
pub const DEFAULT_KEY_PATH: &str = "cert/key.pem";

/// Default signing script.
pub const DEFAULT_SIGN_SCRIPT: &str = "sign.sh";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Sign Server - upload a file, get it back signed.
///
/// Accepts multipart uploads on `POST /sign` over HTTPS, runs the signing
/// script on each file and returns the signed artifact.
#[derive(Parser, Debug, Clone)]
#[command(name = "sign-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SIGN_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SIGN_PORT")]
    pub port: u16,

    /// Working directory holding `uploads/`, the sign script and certificates.
    ///
    /// Defaults to the directory containing the executable.
    #[arg(long, env = "SIGN_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// TLS certificate (PEM).
    #[arg(long, default_value = DEFAULT_CERT_PATH, env = "SIGN_TLS_CERT")]
    pub cert: PathBuf,

    /// TLS private key (PEM).
    #[arg(long, default_value = DEFAULT_KEY_PATH, env = "SIGN_TLS_KEY")]
    pub key: PathBuf,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE, env = "SIGN_MAX_UPLOAD_SIZE")]
    pub max_upload_size: usize,

    // =========================================================================
    // Signing Configuration
    // =========================================================================
    /// Executable invoked with the uploaded file's absolute path.
    #[arg(long, default_value = DEFAULT_SIGN_SCRIPT, env = "SIGN_SCRIPT")]
    pub sign_script: PathBuf,

    /// Seconds a signing run may take before it is killed.
    #[arg(long, default_value_t = DEFAULT_SIGN_TIMEOUT.as_secs(), env = "SIGN_TIMEOUT")]
    pub sign_timeout: u64,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Basic auth username. Must be set together with the password.
    #[arg(long, env = "SIGN_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password. Must be set together with the username.
    #[arg(long, env = "SIGN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Refuse to start unless credentials are configured.
    #[arg(long, default_value_t = false, env = "SIGN_REQUIRE_AUTH")]
    pub require_auth: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.username, &self.password) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(
                    "Both SIGN_USERNAME and SIGN_PASSWORD must be set to enable authentication"
                        .to_string(),
                );
            }
            (Some(user), Some(pass)) if user.is_empty() || pass.is_empty() => {
                return Err("Authentication credentials must not be empty".to_string());
            }
            _ => {}
        }

        if self.require_auth && self.basic_auth().is_none() {
            return Err(
                "Authentication is required but no credentials provided. \
                 Set SIGN_USERNAME and SIGN_PASSWORD"
                    .to_string(),
            );
        }

        if self.sign_timeout == 0 {
            return Err("sign_timeout must be greater than 0".to_string());
        }

        if self.max_upload_size == 0 {
            return Err("max_upload_size must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Basic auth credentials, if both are configured.
    pub fn basic_auth(&self) -> Option<BasicAuth> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some(BasicAuth::new(user, pass))
            }
            _ => None,
        }
    }

    /// Signing timeout as a duration.
    pub fn sign_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_timeout)
    }

    /// Resolve the absolute working directory.
    ///
    /// Uses `base_dir` when set, otherwise the directory of the running
    /// executable.
    pub fn work_dir(&self) -> io::Result<PathBuf> {
        let dir = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => {
                let exe = std::env::current_exe()?;
                exe.parent()
                    .map(Path::to_path_buf)
                    .ok_or_else(|| io::Error::other("executable has no parent directory"))?
            }
        };
        std::path::absolute(dir)
    }

    /// Resolve a configured path against the working directory.
    pub fn resolve(work_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            work_dir.join(path)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
