use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

/// Registers and drops kernel change notifications for single directories.
pub trait WatchBackend {
    fn watch(&mut self, path: &Path) -> notify::Result<()>;
    fn unwatch(&mut self, path: &Path) -> notify::Result<()>;
}

impl WatchBackend for RecommendedWatcher {
    fn watch(&mut self, path: &Path) -> notify::Result<()> {
        // Subtrees created later are not covered by a recursive watch on cgroupfs, so every
        // directory gets its own registration.
        Watcher::watch(self, path, RecursiveMode::NonRecursive)
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        Watcher::unwatch(self, path)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to watch `{path}`: {source}")]
pub struct WatchError {
    pub path: PathBuf,
    #[source]
    pub source: notify::Error,
}

impl WatchError {
    /// Returns `true` if the directory was removed before the watch could be installed.
    pub fn is_vanished(&self) -> bool {
        match &self.source.kind {
            notify::ErrorKind::PathNotFound => true,
            notify::ErrorKind::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// An installed watch on one cgroup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchDescriptor {
    pub path: PathBuf,
}

/// The set of watched cgroup directories, keyed by path.
///
/// Paths are kept ordered so the descendants of a directory form one contiguous range.
#[derive(Debug)]
pub struct WatchSet<B> {
    backend: B,
    watches: BTreeMap<PathBuf, WatchDescriptor>,
}

impl<B: WatchBackend> WatchSet<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            watches: BTreeMap::new(),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.watches.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Installs a watch on `path`.
    ///
    /// Returns `Ok(false)` if the directory is already watched.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchError`] if the backend rejects the watch, e.g. because the directory
    /// vanished or the inotify watch limit is exhausted.
    pub fn add(&mut self, path: &Path) -> Result<bool, WatchError> {
        if self.watches.contains_key(path) {
            return Ok(false);
        }
        self.backend.watch(path).map_err(|source| WatchError {
            path: path.to_path_buf(),
            source,
        })?;
        self.watches.insert(
            path.to_path_buf(),
            WatchDescriptor {
                path: path.to_path_buf(),
            },
        );
        Ok(true)
    }

    /// Drops the watch on `path`, returning its descriptor if it was watched.
    ///
    /// The kernel discards watches of removed directories on its own, so a backend failure
    /// here is only logged.
    pub fn remove(&mut self, path: &Path) -> Option<WatchDescriptor> {
        let descriptor = self.watches.remove(path)?;
        if let Err(err) = self.backend.unwatch(path) {
            log::debug!("watch on `{}` already gone: {err}", path.display());
        }
        Some(descriptor)
    }

    /// Watched directories strictly below `path`, parents before children.
    pub fn descendants_of(&self, path: &Path) -> Vec<PathBuf> {
        self.watches
            .range::<Path, _>((
                std::ops::Bound::Excluded(path),
                std::ops::Bound::Unbounded,
            ))
            .map(|(p, _)| p)
            .take_while(|p| p.starts_with(path))
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut set = WatchSet::new(FakeBackend::default());

        assert!(set.add(tmp.path()).unwrap());
        assert!(!set.add(tmp.path()).unwrap());
        assert_eq!(set.len(), 1);
        assert!(set.backend().watched.contains(tmp.path()));
    }

    #[test]
    fn test_add_vanished_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut set = WatchSet::new(FakeBackend::default());

        let err = set.add(&tmp.path().join("gone")).unwrap_err();
        assert!(err.is_vanished());
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_drops_backend_watch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut set = WatchSet::new(FakeBackend::default());
        set.add(tmp.path()).unwrap();

        let descriptor = set.remove(tmp.path()).unwrap();
        assert_eq!(descriptor.path, tmp.path());
        assert!(!set.contains(tmp.path()));
        assert!(set.backend().watched.is_empty());
        assert_eq!(set.backend().unwatched, vec![tmp.path().to_path_buf()]);
        assert!(set.remove(tmp.path()).is_none());
    }

    #[test]
    fn test_descendants_are_contiguous() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for dir in ["a", "a/b", "a/b/c", "a-sibling", "ab"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        let mut set = WatchSet::new(FakeBackend::default());
        for dir in ["a", "a/b", "a/b/c", "a-sibling", "ab"] {
            set.add(&root.join(dir)).unwrap();
        }

        assert_eq!(
            set.descendants_of(&root.join("a")),
            vec![root.join("a/b"), root.join("a/b/c")]
        );
        assert!(set.descendants_of(&root.join("ab")).is_empty());
    }
}
