//! Temporary storage for uploaded files.
//!
//! Each uploaded part is written to `<work-dir>/uploads/<nanos>-<basename>`,
//! where `<basename>` is the client filename stripped of any directory
//! components. The returned [`StoredUpload`] removes the file when dropped, so
//! every exit path of a request cleans up after itself.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::UploadError;

/// Name of the uploads directory under the working directory.
pub const UPLOADS_DIR: &str = "uploads";

/// Basename used when the client filename is empty after stripping.
const FALLBACK_BASENAME: &str = "upload";

/// Strip directory components from an untrusted client filename.
///
/// Both `/` and `\` are treated as separators, so `../../etc/passwd` and
/// `C:\fakepath\app.apk` reduce to `passwd` and `app.apk`. A bare `.` or `..`
/// is kept: behind the `<nanos>-` prefix it is an ordinary file name.
pub fn sanitize_filename(name: &str) -> String {
    let trimmed = name.trim_end_matches(['/', '\\']);
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace('\0', "");

    if base.is_empty() {
        FALLBACK_BASENAME.to_string()
    } else {
        base
    }
}

/// Build the stored file name `<nanos>-<basename>`.
pub fn stored_file_name(timestamp_nanos: u128, basename: &str) -> String {
    format!("{}-{}", timestamp_nanos, basename)
}

/// Current Unix time in nanoseconds.
fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

/// `Content-Disposition` value naming `basename`, quoted and escaped.
pub fn content_disposition(basename: &str) -> String {
    format!("attachment; filename={:?}", basename)
}

/// An uploaded file on disk, deleted when dropped.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
    basename: String,
}

impl StoredUpload {
    /// Absolute path of the stored file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitized client filename.
    pub fn basename(&self) -> &str {
        &self.basename
    }
}

impl Drop for StoredUpload {
    // Synchronous: the file is gone before the response leaves the handler.
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "Failed to remove upload");
        }
    }
}

/// Writer for a single part being stored.
///
/// Created by [`UploadDir::create`]; feed it chunks with [`write`](Self::write)
/// and finish with [`finish`](Self::finish) to flush and close the file.
pub struct PendingUpload {
    file: File,
    stored: StoredUpload,
}

impl PendingUpload {
    /// Append a chunk of the part's bytes.
    pub async fn write(&mut self, chunk: &Bytes) -> Result<(), UploadError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|source| UploadError::Write {
                path: self.stored.path.clone(),
                source,
            })
    }

    /// Flush and close the file, returning the stored upload.
    pub async fn finish(mut self) -> Result<StoredUpload, UploadError> {
        if let Err(source) = self.file.flush().await {
            return Err(UploadError::Write {
                path: self.stored.path.clone(),
                source,
            });
        }
        if let Err(source) = self.file.sync_all().await {
            return Err(UploadError::Write {
                path: self.stored.path.clone(),
                source,
            });
        }
        let PendingUpload { file, stored } = self;
        drop(file);
        Ok(stored)
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        self.stored.path()
    }
}

/// The shared uploads directory.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Uploads directory under the given working directory.
    pub fn new(work_dir: &Path) -> Self {
        Self {
            root: work_dir.join(UPLOADS_DIR),
        }
    }

    /// Path of the uploads directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory (and parents) if it does not exist yet.
    pub async fn ensure(&self) -> Result<(), UploadError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| UploadError::CreateDir {
                path: self.root.clone(),
                source,
            })
    }

    /// Create a new, uniquely named destination for `client_filename`.
    ///
    /// The file is opened with create-new semantics: a name collision fails
    /// instead of truncating another request's upload.
    pub async fn create(&self, client_filename: &str) -> Result<PendingUpload, UploadError> {
        let basename = sanitize_filename(client_filename);
        let path = self
            .root
            .join(stored_file_name(now_nanos(), &basename));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| UploadError::CreateFile {
                path: path.clone(),
                source,
            })?;

        Ok(PendingUpload {
            file,
            stored: StoredUpload { path, basename },
        })
    }
}
