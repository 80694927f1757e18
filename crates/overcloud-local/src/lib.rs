//! Overcloud Local - host filesystem adapter
//!
//! Implements the [`LocalStore`](overcloud_core::ports::LocalStore) port on
//! top of `std::fs`.

pub mod filesystem;

pub use filesystem::LocalFileSystemAdapter;
