//! DropboxCloudProvider - RemoteStore implementation for the Dropbox API
//!
//! Wraps the [`DropboxClient`] and translates [`DropboxError`]s into the
//! classified [`RemoteError`]s the core reasons about.
//!
//! ## Design Notes
//!
//! - The account root is the empty path. Dropbox refuses `get_metadata` on
//!   it, so `stat("")` answers `Directory` without a request.
//! - Obtaining and refreshing tokens is the job of
//!   [`DropboxConnector`](crate::auth::DropboxConnector); a provider holds a
//!   single access token for its lifetime.

use tracing::debug;

use overcloud_core::domain::EntryKind;
use overcloud_core::ports::{RemoteError, RemoteStore};

use crate::client::DropboxClient;
use crate::DropboxError;

/// Classifies a client error for the core
fn to_remote_error(err: DropboxError) -> RemoteError {
    match err {
        DropboxError::Unauthorized(msg) => RemoteError::Unauthorized(msg),
        DropboxError::NotFound(msg) => RemoteError::NotFound(msg),
        DropboxError::Conflict(msg) => RemoteError::AlreadyExists(msg),
        other => RemoteError::Transport(other.to_string()),
    }
}

/// Dropbox-backed [`RemoteStore`]
#[derive(Debug)]
pub struct DropboxCloudProvider {
    client: DropboxClient,
}

impl DropboxCloudProvider {
    /// Creates a provider from a configured client
    pub fn new(client: DropboxClient) -> Self {
        debug!("Creating DropboxCloudProvider");
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &DropboxClient {
        &self.client
    }
}

impl RemoteStore for DropboxCloudProvider {
    fn verify(&self) -> Result<(), RemoteError> {
        let account = self.client.get_current_account().map_err(to_remote_error)?;
        debug!(account = %account.name.display_name, "Dropbox session verified");
        Ok(())
    }

    fn put(&self, path: &str, data: &[u8]) -> Result<(), RemoteError> {
        self.client.upload(path, data).map_err(to_remote_error)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        self.client.download(path).map_err(to_remote_error)
    }

    fn stat(&self, path: &str) -> Result<EntryKind, RemoteError> {
        if path.is_empty() {
            return Ok(EntryKind::Directory);
        }
        match self.client.get_metadata(path) {
            Ok(metadata) => Ok(metadata.kind()),
            Err(DropboxError::NotFound(_)) => Ok(EntryKind::Absent),
            Err(e) => Err(to_remote_error(e)),
        }
    }

    fn list(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        let entries = self.client.list_folder(path).map_err(to_remote_error)?;
        Ok(entries
            .into_iter()
            .filter(|m| m.kind() != EntryKind::Absent)
            .map(|m| m.name().to_string())
            .collect())
    }

    fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        self.client.create_folder(path).map_err(to_remote_error)
    }

    fn relocate(&self, from: &str, to: &str) -> Result<(), RemoteError> {
        self.client.move_entry(from, to).map_err(|e| match e {
            DropboxError::Conflict(msg) | DropboxError::NotFound(msg) => {
                RemoteError::RelocationConflict(msg)
            }
            other => to_remote_error(other),
        })
    }

    fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.client.delete(path).map_err(to_remote_error)
    }
}
