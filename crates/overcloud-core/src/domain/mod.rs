//! Domain types
//!
//! This module contains the core value types for Overcloud:
//! - `RelativePath`, the normalized path every operation works on
//! - `EntryKind` and the per-operation `ExistenceVector`
//! - Error and per-backend outcome types

pub mod entry;
pub mod errors;
pub mod path;

pub use entry::{EntryKind, ExistenceVector, Probe};
pub use errors::{BackendStatus, SkipReason, StoreError};
pub use path::{normalize, RelativePath};
