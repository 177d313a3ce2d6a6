//! External script signer.
//!
//! Runs a signing executable with the upload path as its only argument and
//! treats a zero exit status as success.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::SignError;

use super::Signer;

/// Default upper bound on a single signing run (5 minutes).
pub const DEFAULT_SIGN_TIMEOUT: Duration = Duration::from_secs(300);

/// Signer backed by an external executable.
///
/// # Example
///
/// ```ignore
/// use sign_server::signer::{ScriptSigner, Signer};
/// use std::time::Duration;
///
/// let signer = ScriptSigner::new("/srv/sign/sign.sh").with_timeout(Duration::from_secs(60));
/// signer.sign(Path::new("/srv/sign/uploads/1700000000-app.apk")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ScriptSigner {
    script: PathBuf,
    timeout: Duration,
}

impl ScriptSigner {
    /// Create a signer that runs `script` with the default timeout.
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            timeout: DEFAULT_SIGN_TIMEOUT,
        }
    }

    /// Set the maximum time a signing run may take before it is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the script as configured.
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Signer for ScriptSigner {
    async fn sign(&self, path: &Path) -> Result<(), SignError> {
        let script = std::path::absolute(&self.script).map_err(SignError::ScriptPath)?;

        debug!(script = %script.display(), path = %path.display(), "Running sign script");

        let run = Command::new(&script)
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        // Dropping the output future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result.map_err(SignError::Launch)?,
            Err(_) => {
                error!(
                    script = %script.display(),
                    path = %path.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "Sign script timed out"
                );
                return Err(SignError::Timeout(self.timeout));
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        error!(
            script = %script.display(),
            path = %path.display(),
            status = %output.status,
            output = %combined,
            "Sign script failed"
        );

        Err(SignError::Failed {
            status: output.status,
            output: combined,
        })
    }
}
