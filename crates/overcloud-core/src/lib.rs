//! Overcloud Core - storage policy over a local disk and a cloud store
//!
//! This crate contains the hexagonal core with:
//! - **Domain types** - `RelativePath`, `EntryKind`, `ExistenceVector`, `StoreError`
//! - **Port definitions** - `LocalStore`, `RemoteStore`, `RemoteConnector`
//! - **DualStore** - the orchestrator deciding, per operation, which backend
//!   to consult and when to repair a file that only one side holds
//! - **Codec** - gzip wrapping for payloads
//!
//! # Architecture
//!
//! Adapters for the host filesystem (`overcloud-local`) and for Dropbox
//! (`overcloud-dropbox`) implement the port traits. The core itself never
//! touches the disk or the network directly; every query is live against
//! the injected backends.

pub mod codec;
pub mod config;
pub mod domain;
pub mod ports;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use store::DualStore;
