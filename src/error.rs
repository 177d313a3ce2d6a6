//! Error types for signing runs and upload requests.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while running a signer against a stored upload
#[derive(Debug, Error)]
pub enum SignError {
    /// The signing script path could not be made absolute
    #[error("resolve sign script: {0}")]
    ScriptPath(#[source] std::io::Error),

    /// The signing process could not be started or waited on
    #[error("{0}")]
    Launch(#[source] std::io::Error),

    /// The signing process ran but exited unsuccessfully.
    ///
    /// `output` holds the combined stdout and stderr of the process. It is
    /// meant for the server log only and is not part of the display message.
    #[error("{status}")]
    Failed { status: ExitStatus, output: String },

    /// The signing process did not finish in time and was killed
    #[error("signing timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors that end an upload-and-sign request.
///
/// The display message of each variant is sent verbatim as the plain-text
/// response body.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Request method other than POST
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Malformed multipart body or body limit exceeded
    #[error("{0}")]
    Multipart(String),

    /// The uploads directory could not be created
    #[error("mkdir {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination file could not be created
    #[error("open {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying the part into the destination file failed
    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The signer failed
    #[error(transparent)]
    Sign(#[from] SignError),
}
