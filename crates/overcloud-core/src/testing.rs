//! In-memory backends for exercising `DualStore` without disk or network
//!
//! Both stores keep a tree of normalized string paths, count the calls
//! made against them and can be told to fail. Writing a file implicitly
//! creates its parent directories on either side, matching the real
//! adapters.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{normalize, EntryKind};
use crate::ports::{LocalStore, RemoteError, RemoteStore};

// ============================================================================
// Shared tree
// ============================================================================

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = path;
    while let Some(idx) = current.rfind('/') {
        current = &current[..idx];
        if !current.is_empty() {
            out.push(current.to_string());
        }
    }
    out
}

fn under(key: &str, path: &str) -> bool {
    key == path || key.starts_with(&format!("{path}/"))
}

impl Tree {
    fn kind(&self, path: &str) -> EntryKind {
        if path.is_empty() {
            return EntryKind::Directory;
        }
        if self.files.contains_key(path) {
            return EntryKind::File;
        }
        let prefix = format!("{path}/");
        let nested = self
            .files
            .keys()
            .chain(self.dirs.iter())
            .any(|k| k.starts_with(&prefix));
        if self.dirs.contains(path) || nested {
            EntryKind::Directory
        } else {
            EntryKind::Absent
        }
    }

    fn children(&self, path: &str) -> Vec<String> {
        let prefix = format!("{path}/");
        let mut names = BTreeSet::new();
        for key in self.files.keys().chain(self.dirs.iter()) {
            if let Some(rest) = key.strip_prefix(&prefix) {
                if let Some(name) = rest.split('/').next().filter(|n| !n.is_empty()) {
                    names.insert(name.to_string());
                }
            }
        }
        names.into_iter().collect()
    }

    fn insert_file(&mut self, path: &str, data: &[u8]) {
        self.dirs.extend(ancestors(path));
        self.files.insert(path.to_string(), data.to_vec());
    }

    fn insert_dir(&mut self, path: &str) {
        self.dirs.extend(ancestors(path));
        self.dirs.insert(path.to_string());
    }

    fn remove_subtree(&mut self, path: &str) {
        self.files.retain(|k, _| !under(k, path));
        self.dirs.retain(|k| !under(k, path));
    }

    fn move_subtree(&mut self, from: &str, to: &str) {
        let files: Vec<(String, Vec<u8>)> = self
            .files
            .iter()
            .filter(|(k, _)| under(k, from))
            .map(|(k, v)| (format!("{to}{}", &k[from.len()..]), v.clone()))
            .collect();
        let dirs: Vec<String> = self
            .dirs
            .iter()
            .filter(|k| under(k, from))
            .map(|k| format!("{to}{}", &k[from.len()..]))
            .collect();
        self.remove_subtree(from);
        for dir in dirs {
            self.insert_dir(&dir);
        }
        for (path, data) in files {
            self.insert_file(&path, &data);
        }
        self.dirs.extend(ancestors(to));
    }
}

fn lock(tree: &Mutex<Tree>) -> MutexGuard<'_, Tree> {
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

fn local_key(path: &Path) -> String {
    normalize(&path.to_string_lossy())
}

// ============================================================================
// MemoryLocalStore
// ============================================================================

/// A [`LocalStore`] backed by memory
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    tree: Mutex<Tree>,
    failing: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file (parents included)
    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.insert_file(path, data);
        self
    }

    /// Seeds a directory (parents included)
    pub fn with_dir(self, path: &str) -> Self {
        lock(&self.tree).insert_dir(&normalize(path));
        self
    }

    pub fn insert_file(&self, path: &str, data: &[u8]) {
        lock(&self.tree).insert_file(&normalize(path), data);
    }

    /// Returns the bytes stored at `path`, if it is a file
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.tree).files.get(&normalize(path)).cloned()
    }

    pub fn kind(&self, path: &str) -> EntryKind {
        lock(&self.tree).kind(&normalize(path))
    }

    /// Makes every call fail with `PermissionDenied`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> io::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"))
        } else {
            Ok(())
        }
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {path}"))
}

fn other(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, message)
}

impl LocalStore for MemoryLocalStore {
    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        self.check()?;
        Ok(lock(&self.tree).kind(&local_key(path)))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let key = local_key(path);
        let tree = lock(&self.tree);
        match tree.kind(&key) {
            EntryKind::File => Ok(tree.files.get(&key).cloned().unwrap_or_default()),
            EntryKind::Directory => Err(other(format!("is a directory: {key}"))),
            EntryKind::Absent => Err(not_found(&key)),
        }
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let key = local_key(path);
        let mut tree = lock(&self.tree);
        if tree.kind(&key) == EntryKind::Directory {
            return Err(other(format!("is a directory: {key}")));
        }
        tree.insert_file(&key, data);
        Ok(())
    }

    fn list(&self, path: &Path) -> io::Result<Vec<String>> {
        self.check()?;
        let key = local_key(path);
        let tree = lock(&self.tree);
        match tree.kind(&key) {
            EntryKind::Directory => Ok(tree.children(&key)),
            EntryKind::File => Err(other(format!("not a directory: {key}"))),
            EntryKind::Absent => Err(not_found(&key)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check()?;
        let key = local_key(path);
        let mut tree = lock(&self.tree);
        if tree.kind(&key) == EntryKind::File {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {key}"),
            ));
        }
        tree.insert_dir(&key);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check()?;
        let (from, to) = (local_key(from), local_key(to));
        let mut tree = lock(&self.tree);
        if !tree.kind(&from).is_present() {
            return Err(not_found(&from));
        }
        if tree.kind(&to) == EntryKind::Directory {
            return Err(other(format!("destination is a directory: {to}")));
        }
        tree.files.remove(&to);
        tree.move_subtree(&from, &to);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.check()?;
        let key = local_key(path);
        let mut tree = lock(&self.tree);
        match tree.kind(&key) {
            EntryKind::File => {
                tree.files.remove(&key);
                Ok(())
            }
            EntryKind::Directory => Err(other(format!("is a directory: {key}"))),
            EntryKind::Absent => Err(not_found(&key)),
        }
    }
}

// ============================================================================
// MemoryRemoteStore
// ============================================================================

/// Snapshot of the calls made against a [`MemoryRemoteStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteCalls {
    pub verifies: usize,
    pub puts: usize,
    pub gets: usize,
    pub stats: usize,
    pub lists: usize,
    pub mkdirs: usize,
    pub relocates: usize,
    pub deletes: usize,
}

#[derive(Debug, Default)]
struct Counters {
    verifies: AtomicUsize,
    puts: AtomicUsize,
    gets: AtomicUsize,
    stats: AtomicUsize,
    lists: AtomicUsize,
    mkdirs: AtomicUsize,
    relocates: AtomicUsize,
    deletes: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// A [`RemoteStore`] backed by memory
///
/// `Arc<MemoryRemoteStore>` is also a
/// [`RemoteConnector`](crate::ports::RemoteConnector).
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    tree: Mutex<Tree>,
    offline: AtomicBool,
    reject_verify: AtomicBool,
    reject_puts: AtomicBool,
    counters: Counters,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file (parents included)
    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.insert_file(path, data);
        self
    }

    /// Seeds a folder (parents included)
    pub fn with_dir(self, path: &str) -> Self {
        lock(&self.tree).insert_dir(&normalize(path));
        self
    }

    pub fn insert_file(&self, path: &str, data: &[u8]) {
        lock(&self.tree).insert_file(&normalize(path), data);
    }

    /// Returns the bytes stored at `path`, if it is a file
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.tree).files.get(&normalize(path)).cloned()
    }

    pub fn kind(&self, path: &str) -> EntryKind {
        lock(&self.tree).kind(&normalize(path))
    }

    /// Makes every call fail with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes `verify` fail with an authorization error
    pub fn set_reject_verify(&self, reject: bool) {
        self.reject_verify.store(reject, Ordering::SeqCst);
    }

    /// Makes `put` fail with a transport error
    pub fn set_reject_puts(&self, reject: bool) {
        self.reject_puts.store(reject, Ordering::SeqCst);
    }

    pub fn calls(&self) -> RemoteCalls {
        let c = &self.counters;
        RemoteCalls {
            verifies: c.verifies.load(Ordering::SeqCst),
            puts: c.puts.load(Ordering::SeqCst),
            gets: c.gets.load(Ordering::SeqCst),
            stats: c.stats.load(Ordering::SeqCst),
            lists: c.lists.load(Ordering::SeqCst),
            mkdirs: c.mkdirs.load(Ordering::SeqCst),
            relocates: c.relocates.load(Ordering::SeqCst),
            deletes: c.deletes.load(Ordering::SeqCst),
        }
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn verify(&self) -> Result<(), RemoteError> {
        bump(&self.counters.verifies);
        self.check()?;
        if self.reject_verify.load(Ordering::SeqCst) {
            return Err(RemoteError::Unauthorized("invalid_access_token".into()));
        }
        Ok(())
    }

    fn put(&self, path: &str, data: &[u8]) -> Result<(), RemoteError> {
        bump(&self.counters.puts);
        self.check()?;
        if self.reject_puts.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("upload rejected".into()));
        }
        let key = normalize(path);
        let mut tree = lock(&self.tree);
        if tree.kind(&key) == EntryKind::Directory {
            return Err(RemoteError::AlreadyExists(key));
        }
        tree.insert_file(&key, data);
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        bump(&self.counters.gets);
        self.check()?;
        let key = normalize(path);
        lock(&self.tree)
            .files
            .get(&key)
            .cloned()
            .ok_or(RemoteError::NotFound(key))
    }

    fn stat(&self, path: &str) -> Result<EntryKind, RemoteError> {
        bump(&self.counters.stats);
        self.check()?;
        Ok(lock(&self.tree).kind(&normalize(path)))
    }

    fn list(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        bump(&self.counters.lists);
        self.check()?;
        let key = normalize(path);
        let tree = lock(&self.tree);
        match tree.kind(&key) {
            EntryKind::Directory => Ok(tree.children(&key)),
            _ => Err(RemoteError::NotFound(key)),
        }
    }

    fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        bump(&self.counters.mkdirs);
        self.check()?;
        let key = normalize(path);
        let mut tree = lock(&self.tree);
        if tree.kind(&key).is_present() {
            return Err(RemoteError::AlreadyExists(key));
        }
        tree.insert_dir(&key);
        Ok(())
    }

    fn relocate(&self, from: &str, to: &str) -> Result<(), RemoteError> {
        bump(&self.counters.relocates);
        self.check()?;
        let (from, to) = (normalize(from), normalize(to));
        let mut tree = lock(&self.tree);
        if !tree.kind(&from).is_present() || tree.kind(&to).is_present() {
            return Err(RemoteError::RelocationConflict(format!("{from} -> {to}")));
        }
        tree.move_subtree(&from, &to);
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), RemoteError> {
        bump(&self.counters.deletes);
        self.check()?;
        let key = normalize(path);
        let mut tree = lock(&self.tree);
        if !tree.kind(&key).is_present() {
            return Err(RemoteError::NotFound(key));
        }
        tree.remove_subtree(&key);
        Ok(())
    }
}
