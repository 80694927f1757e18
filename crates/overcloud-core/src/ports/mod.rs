//! Port definitions (hexagonal architecture interfaces)
//!
//! The traits the core depends on but whose implementations live in
//! adapter crates.
//!
//! ## Ports Overview
//!
//! - [`LocalStore`] - Host filesystem operations
//! - [`RemoteStore`] - Cloud object-store operations
//! - [`RemoteConnector`] - Produces a verified [`RemoteStore`] session

pub mod local_store;
pub mod remote_store;
pub mod session;

pub use local_store::LocalStore;
pub use remote_store::{RemoteError, RemoteStore};
pub use session::{RemoteConnector, Tokens};
