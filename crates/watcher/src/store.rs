//! Snapshot store: last-known modification time per path

use ahash::AHashMap;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Last-known state of the watched directory
///
/// Maps absolute path -> modification time observed by the most recent
/// completed scan. Iteration order carries no meaning but is stable for a
/// given instance between mutations.
///
/// The store itself is not synchronized; [`DirectoryMonitor`](crate::DirectoryMonitor)
/// owns it behind a lock and is the only writer.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    entries: AHashMap<PathBuf, SystemTime>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load the initial directory state
    ///
    /// Must be called on an empty store; no events are associated with
    /// the loaded entries.
    pub fn initialize<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (PathBuf, SystemTime)>,
    {
        debug_assert!(self.entries.is_empty(), "Snapshot::initialize on non-empty store");
        self.entries.extend(entries);
    }

    /// Modification time recorded for `path`, if it was known at the last scan
    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.entries.get(path).copied()
    }

    /// Insert or overwrite the timestamp for `path`
    pub fn set(&mut self, path: PathBuf, mtime: SystemTime) {
        self.entries.insert(path, mtime);
    }

    /// Forget `path`; no-op if absent
    pub fn remove(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    /// Copy of the currently known paths
    pub fn keys(&self) -> Vec<PathBuf> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, SystemTime)> {
        self.entries.iter().map(|(path, mtime)| (path.as_path(), *mtime))
    }
}

/// Read-only, cloneable view of a monitor's snapshot
///
/// Safe to query from inside a listener: the engine never holds the
/// snapshot lock while notifying.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Snapshot>>,
}

impl SnapshotHandle {
    pub(crate) fn new(inner: Arc<RwLock<Snapshot>>) -> Self {
        Self { inner }
    }

    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.inner.read().get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.read().contains(path)
    }

    pub fn keys(&self) -> Vec<PathBuf> {
        self.inner.read().keys()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Owned copy of the whole snapshot
    pub fn to_snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }
}
