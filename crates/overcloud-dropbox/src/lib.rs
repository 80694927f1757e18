//! Overcloud Dropbox - Dropbox HTTP API v2 adapter
//!
//! Provides a blocking client for:
//! - OAuth2 authentication (PKCE code-entry flow, token refresh)
//! - Dropbox file operations (metadata, listing, folders, move, delete)
//! - Single-request uploads and downloads
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 flow, token storage and the session connector
//! - [`client`] - Dropbox API HTTP client
//! - [`provider`] - [`RemoteStore`](overcloud_core::ports::RemoteStore) implementation
//! - [`retry`] - `Retry-After` handling for HTTP 429

pub mod auth;
pub mod client;
pub mod provider;
pub mod retry;

use std::time::Duration;

use thiserror::Error;

pub use auth::{DropboxConnector, FileTokenStorage, KeyringTokenStorage, OAuth2Config, TokenStorage};
pub use client::{ClientSettings, DropboxClient};
pub use provider::DropboxCloudProvider;

/// Errors that can occur when communicating with the Dropbox API
#[derive(Debug, Error)]
pub enum DropboxError {
    /// The access token is invalid, expired or revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The path does not exist (`path/not_found`, `from_lookup/not_found`, ...)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Something already occupies the target path (`path/conflict`, `to/conflict`, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other endpoint-specific error
    #[error("API error ({status}): {summary}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Dropbox `error_summary`, or the raw body
        summary: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// A request argument could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DropboxError {
    /// Classifies a failed response from its status and error summary
    pub fn from_status(status: u16, summary: String) -> Self {
        match status {
            401 => DropboxError::Unauthorized(summary),
            409 if summary.contains("not_found") => DropboxError::NotFound(summary),
            409 if summary.contains("conflict") => DropboxError::Conflict(summary),
            500..=599 => DropboxError::ServerError(summary),
            _ => DropboxError::Api { status, summary },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_error_summaries() {
        assert!(matches!(
            DropboxError::from_status(401, "invalid_access_token/".into()),
            DropboxError::Unauthorized(_)
        ));
        assert!(matches!(
            DropboxError::from_status(409, "path/not_found/..".into()),
            DropboxError::NotFound(_)
        ));
        assert!(matches!(
            DropboxError::from_status(409, "from_lookup/not_found/.".into()),
            DropboxError::NotFound(_)
        ));
        assert!(matches!(
            DropboxError::from_status(409, "to/conflict/file/..".into()),
            DropboxError::Conflict(_)
        ));
        assert!(matches!(
            DropboxError::from_status(409, "path/disallowed_name/".into()),
            DropboxError::Api { status: 409, .. }
        ));
        assert!(matches!(
            DropboxError::from_status(503, "".into()),
            DropboxError::ServerError(_)
        ));
    }

    #[test]
    fn test_error_display() {
        let err = DropboxError::Api {
            status: 400,
            summary: "bad input".into(),
        };
        assert_eq!(err.to_string(), "API error (400): bad input");
    }
}
