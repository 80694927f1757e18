//! DualStore: one filesystem-like interface over a local disk and a cloud
//!
//! Every operation normalizes its path arguments, roots them under the
//! local and remote prefixes, and then follows a fixed per-operation
//! policy:
//!
//! - **exists family** probes local first and the cloud only when needed,
//!   optionally repairing a file that only one side holds
//! - **write** goes to every enabled backend; the cloud side is best-effort
//! - **read** prefers local strictly, without falling back to the cloud
//! - **remove / rename / makedirs** act on each backend independently and
//!   report per-backend outcomes
//!
//! All calls block and run local first, cloud second. Nothing is cached.

mod outcome;
mod policy;

pub use outcome::{MakedirsOutcome, OutcomeSummary, RenameOutcome, WriteOutcome};
pub use policy::{needs_remote_probe, Agreement, PolicyMode, SyncDirection};

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::codec;
use crate::config::StoreConfig;
use crate::domain::{
    BackendStatus, EntryKind, ExistenceVector, Probe, RelativePath, SkipReason, StoreError,
};
use crate::ports::{LocalStore, RemoteConnector, RemoteError, RemoteStore};

/// Largest payload (exclusive) the cloud accepts in a single upload
pub const REMOTE_SIZE_LIMIT: u64 = 150_000_000;

/// Storage facade over a local filesystem and an optional cloud session
pub struct DualStore {
    config: StoreConfig,
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl fmt::Debug for DualStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualStore")
            .field("config", &self.config)
            .field("remote_connected", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}

impl DualStore {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Builds a store, connecting to the cloud once if it is requested
    ///
    /// A failed connection (or a missing connector) turns the cloud off for
    /// the lifetime of the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if no backend is usable afterwards.
    pub fn connect(
        mut config: StoreConfig,
        local: Arc<dyn LocalStore>,
        connector: Option<&dyn RemoteConnector>,
    ) -> Result<Self, StoreError> {
        let remote = if config.use_remote {
            match connector {
                Some(connector) => match connector.connect() {
                    Ok(store) => {
                        info!(prefix = %config.remote_prefix, "Connected to cloud storage");
                        Some(store)
                    }
                    Err(e) => {
                        error!(error = %e, "Cloud connection failed; continuing without the cloud");
                        None
                    }
                },
                None => {
                    warn!("No cloud connector supplied; continuing without the cloud");
                    None
                }
            }
        } else {
            None
        };
        config.use_remote = remote.is_some();

        if !config.use_local && !config.use_remote {
            return Err(StoreError::Config(
                "neither the local filesystem nor the cloud is usable".to_string(),
            ));
        }

        debug!(
            use_local = config.use_local,
            use_remote = config.use_remote,
            sync_if_missing = config.sync_if_missing,
            "DualStore ready"
        );
        Ok(Self {
            config,
            local,
            remote,
        })
    }

    /// Returns the effective configuration (after any degradation)
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn uses_local(&self) -> bool {
        self.config.use_local
    }

    pub fn uses_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Returns the policy a call with `agreement` would follow
    pub fn mode(&self, agreement: Agreement) -> PolicyMode {
        PolicyMode::resolve(&self.config, agreement)
    }

    // ========================================================================
    // Exists family
    // ========================================================================

    /// Returns true if `path` is a file, per the store's policy
    ///
    /// With `sync_if_missing`, a file held by only one side is copied to the
    /// other as a side effect. The answer reflects the state before the copy.
    #[instrument(skip(self))]
    pub fn is_file(&self, path: &str, agreement: Agreement) -> bool {
        self.exists(path, EntryKind::File, agreement)
    }

    /// Returns true if `path` is a directory, per the store's policy
    ///
    /// Directories are never repaired.
    #[instrument(skip(self))]
    pub fn is_dir(&self, path: &str, agreement: Agreement) -> bool {
        self.exists(path, EntryKind::Directory, agreement)
    }

    /// Returns true if `path` holds an entry of `kind`, per the store's policy
    pub fn exists(&self, path: &str, kind: EntryKind, agreement: Agreement) -> bool {
        let path = RelativePath::new(path);
        let probes = self.probe_normalized(&path, kind, agreement);

        if kind == EntryKind::File && self.config.sync_if_missing {
            self.repair(&path, probes);
        }

        let mode = self.mode(agreement);
        let answer = mode.combine(probes, kind);
        debug!(
            path = %path,
            %kind,
            local = %probes.local,
            remote = %probes.remote,
            ?mode,
            answer,
            "Existence check"
        );
        answer
    }

    /// Asks the backends about `path` without combining or repairing
    pub fn probe(&self, path: &str, kind: EntryKind, agreement: Agreement) -> ExistenceVector {
        self.probe_normalized(&RelativePath::new(path), kind, agreement)
    }

    fn probe_normalized(
        &self,
        path: &RelativePath,
        kind: EntryKind,
        agreement: Agreement,
    ) -> ExistenceVector {
        let mut probes = ExistenceVector::unqueried();

        if let Some(local) = self.local() {
            let full = self.local_path(path);
            probes.local = match local.stat(&full) {
                Ok(found) => Probe::Observed(found),
                Err(e) => {
                    warn!(path = %full.display(), error = %e, "Local probe failed");
                    Probe::Failed
                }
            };
        }

        if let Some(remote) = self.remote() {
            if needs_remote_probe(&self.config, agreement, probes.local, kind) {
                let full = self.remote_path(path);
                probes.remote = match remote.stat(full.as_str()) {
                    Ok(found) => Probe::Observed(found),
                    Err(e) => {
                        warn!(path = %full, error = %e, "Cloud probe failed");
                        Probe::Failed
                    }
                };
            }
        }

        if kind.is_present() {
            if let Some(found) = probes.local.mismatch(kind) {
                info!(path = %path, expected = %kind, %found, "Local entry has the other kind");
            }
            if let Some(found) = probes.remote.mismatch(kind) {
                info!(path = %path, expected = %kind, %found, "Cloud entry has the other kind");
            }
        }

        probes
    }

    /// Copies a file to the side that lacks it; failures are only logged
    ///
    /// Only an observed absence triggers a copy. A probe that failed is not
    /// treated as missing, so an unreachable cloud never receives an upload
    /// attempt here (older tooling uploaded in that case too).
    fn repair(&self, path: &RelativePath, probes: ExistenceVector) {
        let Some(remote) = self.remote() else {
            return;
        };
        if !self.config.use_local {
            return;
        }
        let local_path = self.local_path(path);
        let remote_path = self.remote_path(path);

        match (probes.local, probes.remote) {
            (Probe::Observed(EntryKind::File), Probe::Observed(EntryKind::Absent)) => {
                info!(
                    local = %local_path.display(),
                    remote = %remote_path,
                    "File missing in the cloud; uploading"
                );
                match self.upload_file(remote, &local_path, &remote_path) {
                    Ok(()) => info!(remote = %remote_path, "Uploaded missing file"),
                    Err(e @ StoreError::SizeLimitExceeded { .. }) => {
                        warn!(error = %e, "Upload of missing file skipped")
                    }
                    Err(e) => error!(remote = %remote_path, error = %e, "Upload of missing file failed"),
                }
            }
            (Probe::Observed(EntryKind::Absent), Probe::Observed(EntryKind::File)) => {
                info!(
                    local = %local_path.display(),
                    remote = %remote_path,
                    "File missing locally; downloading"
                );
                match self.download_file(remote, &remote_path, &local_path) {
                    Ok(()) => info!(local = %local_path.display(), "Downloaded missing file"),
                    Err(e) => error!(
                        local = %local_path.display(),
                        error = %e,
                        "Download of missing file failed"
                    ),
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // Payload operations
    // ========================================================================

    /// Writes `data` to every enabled backend
    ///
    /// With `use_compression` the payload is gzipped and the path gets a
    /// `.gz` suffix unless it already ends in `.gz` or `.tgz`. Cloud uploads
    /// at or above [`REMOTE_SIZE_LIMIT`] are skipped.
    ///
    /// # Errors
    ///
    /// Local I/O errors propagate when local is the only enabled backend;
    /// otherwise they are recorded in the outcome and the cloud upload still
    /// runs. [`StoreError::NoBackendWritten`] if no backend took the payload.
    #[instrument(skip(self, data))]
    pub fn write(
        &self,
        path: &str,
        data: impl AsRef<[u8]>,
        use_compression: bool,
    ) -> Result<WriteOutcome, StoreError> {
        let mut path = RelativePath::new(path);
        let payload: Cow<'_, [u8]> = if use_compression {
            path = codec::compressed_path(&path);
            Cow::Owned(codec::compress(data.as_ref())?)
        } else {
            Cow::Borrowed(data.as_ref())
        };

        let local = match self.local() {
            Some(local) => {
                let full = self.local_path(&path);
                match local.write(&full, &payload) {
                    Ok(()) => {
                        debug!(path = %full.display(), bytes = payload.len(), "Wrote local file");
                        BackendStatus::Applied
                    }
                    Err(e) if self.remote().is_some() => {
                        error!(path = %full.display(), error = %e, "Local write failed");
                        BackendStatus::Failed(e.to_string())
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            None => BackendStatus::Disabled,
        };

        let remote = match self.remote() {
            Some(remote) => {
                let full = self.remote_path(&path);
                let size = payload.len() as u64;
                if size >= REMOTE_SIZE_LIMIT {
                    warn!(path = %full, size, limit = REMOTE_SIZE_LIMIT, "Payload too large for the cloud; skipped");
                    BackendStatus::Skipped(SkipReason::SizeLimitExceeded {
                        size,
                        limit: REMOTE_SIZE_LIMIT,
                    })
                } else {
                    match remote.put(full.as_str(), &payload) {
                        Ok(()) => {
                            debug!(path = %full, bytes = size, "Uploaded cloud file");
                            BackendStatus::Applied
                        }
                        Err(e) => {
                            error!(path = %full, error = %e, "Cloud upload failed");
                            BackendStatus::Failed(e.to_string())
                        }
                    }
                }
            }
            None => BackendStatus::Disabled,
        };

        if !local.is_applied() && !remote.is_applied() {
            error!(path = %path, "Write reached no backend");
            return Err(StoreError::NoBackendWritten(path.to_string()));
        }
        Ok(WriteOutcome {
            path,
            local,
            remote,
        })
    }

    /// Reads the bytes at `path`, from local if enabled, else from the cloud
    ///
    /// There is no fallback: with local enabled a missing local file is
    /// [`StoreError::NotFound`] even if the cloud holds it.
    #[instrument(skip(self))]
    pub fn read(&self, path: &str, use_compression: bool) -> Result<Vec<u8>, StoreError> {
        let mut path = RelativePath::new(path);
        if use_compression {
            path = codec::compressed_path(&path);
        }

        let raw = if self.local().is_some() {
            self.read_local(&self.local_path(&path))?
        } else if let Some(remote) = self.remote() {
            let full = self.remote_path(&path);
            remote.get(full.as_str()).map_err(|e| {
                error!(path = %full, error = %e, "Cloud download failed");
                StoreError::from(e)
            })?
        } else {
            return Err(StoreError::NoBackendAvailable);
        };

        if use_compression {
            codec::decompress(&raw)
        } else {
            Ok(raw)
        }
    }

    /// [`read`](Self::read) decoded as UTF-8
    pub fn read_to_string(&self, path: &str, use_compression: bool) -> Result<String, StoreError> {
        Ok(String::from_utf8(self.read(path, use_compression)?)?)
    }

    // ========================================================================
    // Namespace operations
    // ========================================================================

    /// Deletes `path` on every enabled backend
    ///
    /// Returns true if every enabled backend no longer holds the entry.
    #[instrument(skip(self))]
    pub fn remove(&self, path: &str) -> bool {
        let path = RelativePath::new(path);

        let local_gone = match self.local() {
            None => true,
            Some(local) => {
                let full = self.local_path(&path);
                match local.remove_file(&full) {
                    Ok(()) => {
                        info!(path = %full.display(), "Deleted local file");
                        true
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        debug!(path = %full.display(), "Local file already absent");
                        true
                    }
                    Err(e) => {
                        error!(path = %full.display(), error = %e, "Local delete failed");
                        false
                    }
                }
            }
        };

        let remote_gone = match self.remote() {
            None => true,
            Some(remote) => {
                let full = self.remote_path(&path);
                match remote.delete(full.as_str()) {
                    Ok(()) => {
                        info!(path = %full, "Deleted cloud entry");
                        true
                    }
                    Err(RemoteError::NotFound(_)) => {
                        debug!(path = %full, "Cloud entry already absent");
                        true
                    }
                    Err(e) => {
                        error!(path = %full, error = %e, "Cloud delete failed");
                        false
                    }
                }
            }
        };

        local_gone && remote_gone
    }

    /// Renames `src` to `dst` on every enabled backend; never fails
    #[instrument(skip(self))]
    pub fn rename(&self, src: &str, dst: &str) -> RenameOutcome {
        let src = RelativePath::new(src);
        let dst = RelativePath::new(dst);

        let local = match self.local() {
            Some(local) => self.rename_local(local, &src, &dst),
            None => BackendStatus::Disabled,
        };

        let remote = match self.remote() {
            Some(remote) => {
                let from = self.remote_path(&src);
                let to = self.remote_path(&dst);
                match remote.relocate(from.as_str(), to.as_str()) {
                    Ok(()) => {
                        info!(%from, %to, "Moved cloud entry");
                        BackendStatus::Applied
                    }
                    Err(RemoteError::RelocationConflict(detail)) => {
                        warn!(%from, %to, %detail, "Cloud destination exists or source is missing");
                        BackendStatus::Skipped(SkipReason::RelocationConflict)
                    }
                    Err(e) => {
                        error!(%from, %to, error = %e, "Cloud move failed");
                        BackendStatus::Failed(e.to_string())
                    }
                }
            }
            None => BackendStatus::Disabled,
        };

        RenameOutcome { local, remote }
    }

    fn rename_local(
        &self,
        local: &dyn LocalStore,
        src: &RelativePath,
        dst: &RelativePath,
    ) -> BackendStatus {
        let from = self.local_path(src);
        let to = self.local_path(dst);

        match local.stat(&to) {
            Ok(kind) if kind.is_present() => {
                warn!(to = %to.display(), "Local destination exists; rename skipped");
                return BackendStatus::Skipped(SkipReason::DestinationExists);
            }
            Ok(_) => {}
            Err(e) => {
                error!(to = %to.display(), error = %e, "Local rename failed");
                return BackendStatus::Failed(e.to_string());
            }
        }
        match local.stat(&from) {
            Ok(EntryKind::Absent) => {
                warn!(from = %from.display(), "Local source missing; rename skipped");
                return BackendStatus::Skipped(SkipReason::SourceMissing);
            }
            Ok(_) => {}
            Err(e) => {
                error!(from = %from.display(), error = %e, "Local rename failed");
                return BackendStatus::Failed(e.to_string());
            }
        }

        match local.rename(&from, &to) {
            Ok(()) => {
                info!(from = %from.display(), to = %to.display(), "Renamed local entry");
                BackendStatus::Applied
            }
            Err(e) => {
                error!(from = %from.display(), to = %to.display(), error = %e, "Local rename failed");
                BackendStatus::Failed(e.to_string())
            }
        }
    }

    /// Lists the entry names under `path`
    ///
    /// With `sync_if_missing` only names present on both sides are returned
    /// (local order). Listings are never synchronized.
    #[instrument(skip(self))]
    pub fn listdir(&self, path: &str) -> Vec<String> {
        let path = RelativePath::new(path);

        let local_names = match self.local() {
            Some(local) => {
                let full = self.local_path(&path);
                local.list(&full).unwrap_or_else(|e| {
                    warn!(path = %full.display(), error = %e, "Local listing failed");
                    Vec::new()
                })
            }
            None => Vec::new(),
        };

        let remote_names = match self.remote() {
            Some(remote) if local_names.is_empty() || self.config.sync_if_missing => {
                let full = self.remote_path(&path);
                remote.list(full.as_str()).unwrap_or_else(|e| {
                    error!(path = %full, error = %e, "Cloud listing failed");
                    Vec::new()
                })
            }
            _ => Vec::new(),
        };

        if self.config.sync_if_missing && self.config.use_local && self.uses_remote() {
            debug!(path = %path, "Listing entries present on both sides");
            let remote_names: HashSet<String> = remote_names.into_iter().collect();
            local_names
                .into_iter()
                .filter(|name| remote_names.contains(name))
                .collect()
        } else if local_names.is_empty() {
            remote_names
        } else {
            local_names
        }
    }

    /// Creates `path` and any missing parents on every enabled backend
    ///
    /// The local side is skipped when anything already occupies `path`; the
    /// cloud folder is requested regardless.
    ///
    /// # Errors
    ///
    /// Local I/O errors propagate when local is the only enabled backend;
    /// cloud failures are reported in the outcome.
    #[instrument(skip(self))]
    pub fn makedirs(&self, path: &str) -> Result<MakedirsOutcome, StoreError> {
        let path = RelativePath::new(path);

        let local = match self.local() {
            Some(local) => {
                let full = self.local_path(&path);
                let created = local.stat(&full).and_then(|kind| match kind {
                    EntryKind::Absent => local.create_dir_all(&full).map(|()| true),
                    EntryKind::Directory => Ok(false),
                    EntryKind::File => {
                        warn!(path = %full.display(), "Local path is a file; directory not created");
                        Ok(false)
                    }
                });
                match created {
                    Ok(true) => {
                        info!(path = %full.display(), "Created local directory");
                        BackendStatus::Applied
                    }
                    Ok(false) => BackendStatus::Skipped(SkipReason::AlreadyExists),
                    Err(e) if self.remote().is_some() => {
                        error!(path = %full.display(), error = %e, "Local directory creation failed");
                        BackendStatus::Failed(e.to_string())
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            None => BackendStatus::Disabled,
        };

        let remote = match self.remote() {
            Some(_) if self.remote_path(&path).is_root() => {
                BackendStatus::Skipped(SkipReason::AlreadyExists)
            }
            Some(remote) => {
                let full = self.remote_path(&path);
                match remote.mkdir(full.as_str()) {
                    Ok(()) => {
                        info!(path = %full, "Created cloud folder");
                        BackendStatus::Applied
                    }
                    Err(RemoteError::AlreadyExists(_)) => {
                        info!(path = %full, "Cloud folder already exists");
                        BackendStatus::Skipped(SkipReason::AlreadyExists)
                    }
                    Err(e) => {
                        error!(path = %full, error = %e, "Cloud folder creation failed");
                        BackendStatus::Failed(e.to_string())
                    }
                }
            }
            None => BackendStatus::Disabled,
        };

        Ok(MakedirsOutcome { local, remote })
    }

    // ========================================================================
    // Explicit sync
    // ========================================================================

    /// Copies one file between the backends in `direction`
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] unless both backends are enabled; transfer
    /// errors propagate.
    #[instrument(skip(self))]
    pub fn sync_file(
        &self,
        local_rel: &str,
        remote_rel: &str,
        direction: SyncDirection,
    ) -> Result<(), StoreError> {
        let remote = match self.remote() {
            Some(remote) if self.config.use_local => remote,
            _ => {
                error!("Cannot sync unless both the local filesystem and the cloud are on");
                return Err(StoreError::Config(
                    "syncing needs both the local filesystem and the cloud".to_string(),
                ));
            }
        };
        let local_path = self.local_path(&RelativePath::new(local_rel));
        let remote_path = self.remote_path(&RelativePath::new(remote_rel));

        match direction {
            SyncDirection::Upload => self.upload_file(remote, &local_path, &remote_path)?,
            SyncDirection::Download => self.download_file(remote, &remote_path, &local_path)?,
        }
        info!(
            local = %local_path.display(),
            remote = %remote_path,
            ?direction,
            "Synced file"
        );
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn local(&self) -> Option<&dyn LocalStore> {
        self.config.use_local.then(|| self.local.as_ref())
    }

    fn remote(&self) -> Option<&dyn RemoteStore> {
        self.remote.as_deref()
    }

    fn local_path(&self, path: &RelativePath) -> PathBuf {
        path.local_path(&self.config.local_prefix)
    }

    fn remote_path(&self, path: &RelativePath) -> RelativePath {
        path.remote_path(&self.config.remote_prefix)
    }

    fn read_local(&self, full: &Path) -> Result<Vec<u8>, StoreError> {
        self.local.read(full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(full.display().to_string()),
            _ => StoreError::Io(e),
        })
    }

    fn upload_file(
        &self,
        remote: &dyn RemoteStore,
        local_path: &Path,
        remote_path: &RelativePath,
    ) -> Result<(), StoreError> {
        let data = self.read_local(local_path)?;
        let size = data.len() as u64;
        if size >= REMOTE_SIZE_LIMIT {
            return Err(StoreError::SizeLimitExceeded {
                path: remote_path.to_string(),
                size,
                limit: REMOTE_SIZE_LIMIT,
            });
        }
        ensure_remote_parent(remote, remote_path)?;
        remote.put(remote_path.as_str(), &data)?;
        Ok(())
    }

    fn download_file(
        &self,
        remote: &dyn RemoteStore,
        remote_path: &RelativePath,
        local_path: &Path,
    ) -> Result<(), StoreError> {
        let data = remote.get(remote_path.as_str())?;
        self.local.write(local_path, &data)?;
        Ok(())
    }
}

/// Creates the cloud parent folder of `path` unless it is already a folder
fn ensure_remote_parent(remote: &dyn RemoteStore, path: &RelativePath) -> Result<(), RemoteError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if matches!(remote.stat(parent.as_str()), Ok(EntryKind::Directory)) {
        return Ok(());
    }
    match remote.mkdir(parent.as_str()) {
        Ok(()) | Err(RemoteError::AlreadyExists(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
