//! Entry kinds and existence probes
//!
//! Every branching decision in `DualStore` is driven by what each backend
//! reports for a path. The answers are collected per call into an
//! [`ExistenceVector`] and thrown away afterwards; nothing is cached.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// What a backend holds at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Absent,
}

impl EntryKind {
    /// Returns true for anything other than [`EntryKind::Absent`]
    #[must_use]
    pub fn is_present(self) -> bool {
        !matches!(self, EntryKind::Absent)
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Absent => "absent",
        };
        write!(f, "{s}")
    }
}

/// Result of asking one backend about a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The backend is disabled, or the policy skipped the query
    NotQueried,
    /// The backend answered
    Observed(EntryKind),
    /// The backend could not be asked (I/O or transport failure)
    Failed,
}

impl Probe {
    /// Returns true only if the backend answered with exactly `kind`
    ///
    /// A failed or skipped probe never matches, and an entry of the other
    /// kind counts as absent for the query.
    #[must_use]
    pub fn is(self, kind: EntryKind) -> bool {
        self == Probe::Observed(kind)
    }

    /// Returns true if the backend answered that nothing is there
    #[must_use]
    pub fn is_absent(self) -> bool {
        self == Probe::Observed(EntryKind::Absent)
    }

    /// Returns the observed kind that conflicts with `wanted`, if any
    #[must_use]
    pub fn mismatch(self, wanted: EntryKind) -> Option<EntryKind> {
        match self {
            Probe::Observed(kind) if kind.is_present() && kind != wanted => Some(kind),
            _ => None,
        }
    }
}

impl Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::NotQueried => write!(f, "not-queried"),
            Probe::Observed(kind) => write!(f, "{kind}"),
            Probe::Failed => write!(f, "failed"),
        }
    }
}

/// What both backends reported for a path during one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistenceVector {
    pub local: Probe,
    pub remote: Probe,
}

impl ExistenceVector {
    /// A vector where neither backend has been queried yet
    #[must_use]
    pub fn unqueried() -> Self {
        Self {
            local: Probe::NotQueried,
            remote: Probe::NotQueried,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_matches_only_observed_kind() {
        assert!(Probe::Observed(EntryKind::File).is(EntryKind::File));
        assert!(!Probe::Observed(EntryKind::Directory).is(EntryKind::File));
        assert!(!Probe::Failed.is(EntryKind::File));
        assert!(!Probe::NotQueried.is(EntryKind::Absent));
    }

    #[test]
    fn test_probe_mismatch() {
        assert_eq!(
            Probe::Observed(EntryKind::Directory).mismatch(EntryKind::File),
            Some(EntryKind::Directory)
        );
        assert_eq!(Probe::Observed(EntryKind::File).mismatch(EntryKind::File), None);
        assert_eq!(Probe::Observed(EntryKind::Absent).mismatch(EntryKind::File), None);
        assert_eq!(Probe::Failed.mismatch(EntryKind::File), None);
    }

    #[test]
    fn test_entry_kind_display() {
        assert_eq!(EntryKind::File.to_string(), "file");
        assert_eq!(EntryKind::Directory.to_string(), "directory");
        assert_eq!(Probe::Observed(EntryKind::Absent).to_string(), "absent");
        assert_eq!(Probe::Failed.to_string(), "failed");
    }
}
