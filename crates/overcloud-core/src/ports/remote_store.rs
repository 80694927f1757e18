//! Remote store port (driven/secondary port)
//!
//! The minimal capability set the core needs from a cloud object store.
//! Paths are rooted under the remote prefix and normalized; the remote
//! root is the empty string.
//!
//! ## Design Notes
//!
//! - Errors are classified into [`RemoteError`] so the core can decide
//!   which failures are non-fatal skips (`AlreadyExists` on mkdir,
//!   `RelocationConflict` on move) without inspecting messages.
//! - All methods assume a live session; obtaining one is the job of a
//!   [`RemoteConnector`](crate::ports::RemoteConnector).

use thiserror::Error;

use crate::domain::{EntryKind, StoreError};

/// Classified failures of a remote store call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Nothing at the path
    #[error("Remote path not found: {0}")]
    NotFound(String),

    /// Something already occupies the path
    #[error("Remote path already exists: {0}")]
    AlreadyExists(String),

    /// Move refused: the destination exists or the source is absent
    #[error("Remote relocation conflict: {0}")]
    RelocationConflict(String),

    /// The access credential was rejected
    #[error("Remote access unauthorized: {0}")]
    Unauthorized(String),

    /// Network failure or unexpected response
    #[error("Remote transport error: {0}")]
    Transport(String),
}

impl From<RemoteError> for StoreError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(path) => StoreError::NotFound(path),
            RemoteError::RelocationConflict(msg) => StoreError::RelocationConflict(msg),
            other => StoreError::Transport(other.to_string()),
        }
    }
}

/// Port trait for cloud object-store operations
pub trait RemoteStore: Send + Sync {
    /// Checks that the session is usable (e.g. fetches the current account)
    fn verify(&self) -> Result<(), RemoteError>;

    /// Uploads `data` to `path`, overwriting any existing file
    fn put(&self, path: &str, data: &[u8]) -> Result<(), RemoteError>;

    /// Downloads the file at `path`
    fn get(&self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Reports what is at `path`; a missing path is [`EntryKind::Absent`]
    fn stat(&self, path: &str) -> Result<EntryKind, RemoteError>;

    /// Lists the entry names directly under the folder at `path`
    fn list(&self, path: &str) -> Result<Vec<String>, RemoteError>;

    /// Creates a folder (and any missing parents)
    fn mkdir(&self, path: &str) -> Result<(), RemoteError>;

    /// Moves `from` to `to`
    fn relocate(&self, from: &str, to: &str) -> Result<(), RemoteError>;

    /// Deletes the file or folder at `path`
    fn delete(&self, path: &str) -> Result<(), RemoteError>;
}
