//! Local filesystem port (driven/secondary port)
//!
//! ## Design Notes
//!
//! - Uses `std::io::Result` so the core can tell a missing entry
//!   (`ErrorKind::NotFound`) from any other failure.
//! - Paths are already rooted under the local prefix by the caller.
//! - All methods block; the core is synchronous.

use std::io;
use std::path::Path;

use crate::domain::EntryKind;

/// Port trait for local filesystem operations
pub trait LocalStore: Send + Sync {
    /// Reports what is at `path`
    ///
    /// Returns [`EntryKind::Absent`] for missing paths instead of an error.
    fn stat(&self, path: &Path) -> io::Result<EntryKind>;

    /// Reads the entire contents of a file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes data to a file, replacing any previous content
    ///
    /// Missing parent directories are created.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Lists the entry names directly under a directory
    fn list(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Creates a directory and all missing parents (`mkdir -p`)
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Renames a file or directory
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes a single file
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}
