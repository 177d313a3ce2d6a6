//! Signing abstraction.
//!
//! The upload handler does not know how a file gets signed. It hands the
//! absolute path of a stored upload to a [`Signer`] and expects the file at
//! that same path to be signed once the call returns successfully.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Upload-and-Sign Handler        │
//! └────────────────────┬────────────────────┘
//!                      │ sign(path)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Signer Trait               │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ScriptSigner                │
//! │   (runs `sign.sh <path>`, with timeout) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! An in-process signing library can replace the script by implementing
//! [`Signer`] without touching the handler.

mod script;

use std::path::Path;

use async_trait::async_trait;

use crate::error::SignError;

pub use script::{ScriptSigner, DEFAULT_SIGN_TIMEOUT};

/// Something that signs a file in place.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign the file at `path`, leaving the signed result at the same path.
    async fn sign(&self, path: &Path) -> Result<(), SignError>;
}
