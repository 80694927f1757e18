//! Per-operation results
//!
//! Each mutating `DualStore` operation reports what happened on both
//! backends, so partial success is visible to callers without an error.

use serde::Serialize;

use crate::domain::{BackendStatus, RelativePath};

/// Result of `DualStore::write`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Path actually written (carries the compression suffix if one was added)
    pub path: RelativePath,
    pub local: BackendStatus,
    pub remote: BackendStatus,
}

/// Result of `DualStore::rename`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub local: BackendStatus,
    pub remote: BackendStatus,
}

/// Result of `DualStore::makedirs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakedirsOutcome {
    pub local: BackendStatus,
    pub remote: BackendStatus,
}

/// Flat view of an outcome for display and JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub path: Option<String>,
    pub local: String,
    pub remote: String,
}

impl From<&WriteOutcome> for OutcomeSummary {
    fn from(outcome: &WriteOutcome) -> Self {
        Self {
            path: Some(outcome.path.to_string()),
            local: outcome.local.to_string(),
            remote: outcome.remote.to_string(),
        }
    }
}

impl From<&RenameOutcome> for OutcomeSummary {
    fn from(outcome: &RenameOutcome) -> Self {
        Self {
            path: None,
            local: outcome.local.to_string(),
            remote: outcome.remote.to_string(),
        }
    }
}

impl From<&MakedirsOutcome> for OutcomeSummary {
    fn from(outcome: &MakedirsOutcome) -> Self {
        Self {
            path: None,
            local: outcome.local.to_string(),
            remote: outcome.remote.to_string(),
        }
    }
}
