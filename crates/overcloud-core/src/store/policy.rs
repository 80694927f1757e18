//! Consistency policy
//!
//! The four ways a `DualStore` can combine its backends, resolved once per
//! call from the store's configuration and the caller's [`Agreement`].

use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::domain::{EntryKind, ExistenceVector, Probe};

/// How the two backends' answers are combined for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyMode {
    /// Only the local filesystem is consulted
    LocalOnly,
    /// Only the cloud is consulted
    RemoteOnly,
    /// Both are consulted; either one answering is enough (OR)
    DualLenient,
    /// Both are consulted; both must answer (AND)
    DualStrict,
}

/// Caller override for how strictly the backends must agree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agreement {
    /// Follow the store configuration
    #[default]
    Configured,
    /// One backend holding the entry is enough, even in sync mode
    Either,
    /// Both backends must hold the entry; the cloud is always queried
    Both,
}

/// Direction of an explicit single-file copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Local filesystem to cloud
    Upload,
    /// Cloud to local filesystem
    Download,
}

impl PolicyMode {
    /// Picks the mode for one call
    #[must_use]
    pub fn resolve(config: &StoreConfig, agreement: Agreement) -> Self {
        match (config.use_local, config.use_remote) {
            (true, false) => PolicyMode::LocalOnly,
            (false, true) => PolicyMode::RemoteOnly,
            _ => match agreement {
                Agreement::Either => PolicyMode::DualLenient,
                Agreement::Both => PolicyMode::DualStrict,
                Agreement::Configured if config.sync_if_missing => PolicyMode::DualStrict,
                Agreement::Configured => PolicyMode::DualLenient,
            },
        }
    }

    /// Returns true if the local filesystem is queried in this mode
    #[must_use]
    pub fn uses_local(self) -> bool {
        !matches!(self, PolicyMode::RemoteOnly)
    }

    /// Returns true if the cloud is queried in this mode
    #[must_use]
    pub fn uses_remote(self) -> bool {
        !matches!(self, PolicyMode::LocalOnly)
    }

    /// Reduces the observed probes to the final answer for `kind`
    ///
    /// Failed and skipped probes count as absent.
    #[must_use]
    pub fn combine(self, probes: ExistenceVector, kind: EntryKind) -> bool {
        let local = probes.local.is(kind);
        let remote = probes.remote.is(kind);
        match self {
            PolicyMode::LocalOnly => local,
            PolicyMode::RemoteOnly => remote,
            PolicyMode::DualLenient => local || remote,
            PolicyMode::DualStrict => local && remote,
        }
    }
}

/// Decides whether the cloud has to be asked after the local answer
///
/// The cloud is skipped only when the local filesystem already said yes
/// and nothing asks for both sides.
#[must_use]
pub fn needs_remote_probe(
    config: &StoreConfig,
    agreement: Agreement,
    local: Probe,
    kind: EntryKind,
) -> bool {
    config.use_remote
        && (config.sync_if_missing || agreement == Agreement::Both || !local.is(kind))
}
