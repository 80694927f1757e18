//! Error and outcome types
//!
//! [`StoreError`] is what a `DualStore` operation raises. Most remote
//! problems never become a `StoreError`: they are logged where they occur
//! and recorded as a [`BackendStatus`] in the operation's outcome, so the
//! non-fatal cases stay visible in the return type.

use std::fmt::{self, Display};
use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors raised by `DualStore` operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// No usable backend, or an operation needs a backend that is disabled
    #[error("Configuration error: {0}")]
    Config(String),

    /// The consulted backend has nothing at the path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload too large for the remote single-object ceiling
    #[error("Payload of {size} bytes for {path} exceeds the remote limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Remote path of the payload
        path: String,
        /// Encoded payload size in bytes
        size: u64,
        /// The ceiling in bytes
        limit: u64,
    },

    /// Rename destination exists or source is missing
    #[error("Relocation conflict: {0}")]
    RelocationConflict(String),

    /// The remote backend is unreachable or failed unexpectedly
    #[error("Transport error: {0}")]
    Transport(String),

    /// A write reached none of the enabled backends
    #[error("No backend written for {0}")]
    NoBackendWritten(String),

    /// Neither backend is enabled
    #[error("No storage backend available")]
    NoBackendAvailable,

    /// A local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Gzip encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// Text was requested but the payload is not UTF-8
    #[error("Payload is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),
}

/// Why a backend did not apply an operation, without counting as a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Payload at or above the remote single-object ceiling
    SizeLimitExceeded { size: u64, limit: u64 },
    /// Rename destination already present
    DestinationExists,
    /// Rename source not present
    SourceMissing,
    /// Remote rename refused (destination exists or source absent)
    RelocationConflict,
    /// Directory already present
    AlreadyExists,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SizeLimitExceeded { size, limit } => {
                write!(f, "payload of {size} bytes exceeds {limit} bytes")
            }
            SkipReason::DestinationExists => write!(f, "destination exists"),
            SkipReason::SourceMissing => write!(f, "source missing"),
            SkipReason::RelocationConflict => write!(f, "relocation conflict"),
            SkipReason::AlreadyExists => write!(f, "already exists"),
        }
    }
}

/// What one backend did during an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// The backend is not enabled on this instance
    Disabled,
    /// The operation took effect
    Applied,
    /// The backend deliberately did nothing
    Skipped(SkipReason),
    /// The backend failed; the error was logged
    Failed(String),
}

impl BackendStatus {
    /// Returns true if the operation took effect on this backend
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, BackendStatus::Applied)
    }

    /// Returns true if the backend is enabled
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, BackendStatus::Disabled)
    }
}

impl Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Disabled => write!(f, "disabled"),
            BackendStatus::Applied => write!(f, "applied"),
            BackendStatus::Skipped(reason) => write!(f, "skipped ({reason})"),
            BackendStatus::Failed(message) => write!(f, "failed ({message})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("/x/y.txt".to_string());
        assert_eq!(err.to_string(), "Not found: /x/y.txt");

        let err = StoreError::SizeLimitExceeded {
            path: "/big.bin".to_string(),
            size: 150_000_000,
            limit: 150_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Payload of 150000000 bytes for /big.bin exceeds the remote limit of 150000000 bytes"
        );

        assert_eq!(
            StoreError::NoBackendAvailable.to_string(),
            "No storage backend available"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_backend_status_display() {
        assert_eq!(BackendStatus::Applied.to_string(), "applied");
        assert_eq!(
            BackendStatus::Skipped(SkipReason::DestinationExists).to_string(),
            "skipped (destination exists)"
        );
        assert!(!BackendStatus::Disabled.is_enabled());
        assert!(BackendStatus::Failed("boom".into()).is_enabled());
    }
}
