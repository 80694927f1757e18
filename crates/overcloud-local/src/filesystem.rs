//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`LocalStore`] using blocking `std::fs` calls.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: Writes go to a uniquely named temporary file in the
//!   target's directory, which is then persisted over the target. A crash
//!   never leaves a partial file and existing siblings are never touched.
//! - **Sorted listings**: Directory entries are returned sorted by name so
//!   results do not depend on the platform's directory order.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use overcloud_core::domain::EntryKind;
use overcloud_core::ports::LocalStore;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

// ============================================================================
// LocalFileSystemAdapter struct
// ============================================================================

/// Adapter that bridges the [`LocalStore`] port to the real filesystem.
///
/// This is a zero-sized struct because all operations receive fully rooted
/// paths. The local prefix lives in the store configuration.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    /// Create a new `LocalFileSystemAdapter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Permissions the written file should end up with, if known
fn target_permissions(path: &Path) -> io::Result<Option<fs::Permissions>> {
    match fs::metadata(path) {
        Ok(m) => Ok(Some(m.permissions())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(default_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

// ============================================================================
// LocalStore implementation
// ============================================================================

impl LocalStore for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        match fs::metadata(path) {
            Ok(m) if m.is_dir() => Ok(EntryKind::Directory),
            Ok(_) => Ok(EntryKind::File),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path not found");
                Ok(EntryKind::Absent)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let data = fs::read(path)?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(path = %path.display(), bytes = data.len()))]
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        // Same directory as the target, so the rename stays on one filesystem.
        // The temporary file is removed on drop if anything below fails.
        let mut tmp = NamedTempFile::new_in(parent)?;
        debug!(tmp_path = ?tmp.path(), "writing to temporary file");
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        // Temporary files are created owner-only; keep the target's mode.
        if let Some(permissions) = target_permissions(path)? {
            tmp.as_file().set_permissions(permissions)?;
        }
        tmp.persist(path).map_err(|e| e.error)?;

        debug!("write complete");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn list(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        debug!(entries = names.len(), "directory listed");
        Ok(names)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)?;
        debug!("directory created");
        Ok(())
    }

    #[instrument(skip(self), fields(from = %from.display(), to = %to.display()))]
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)?;
        debug!("rename complete");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)?;
        debug!("file removed");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
