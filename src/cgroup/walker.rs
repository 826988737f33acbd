use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use crate::event::{Event, EventSink, PathStatus};
use crate::fsutil;

use super::dispatch::{DEVICES_LIST, Dispatcher};
use super::kind::FileKind;
use super::watch::{WatchBackend, WatchError, WatchSet};

/// Counters collected while walking a hierarchy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub directories: usize,
    pub files: usize,
    /// Directories that vanished or could not be listed.
    pub skipped: usize,
}

impl AddAssign for WalkStats {
    fn add_assign(&mut self, rhs: Self) {
        self.directories += rhs.directories;
        self.files += rhs.files;
        self.skipped += rhs.skipped;
    }
}

/// Depth-first snapshot of one cgroup hierarchy.
///
/// Every directory gets a watch before its files are read, so changes racing with the walk
/// are reported later by the change watcher.
pub struct TreeWalker<'a, B> {
    watches: &'a mut WatchSet<B>,
    dispatcher: &'a mut Dispatcher,
    sink: &'a mut dyn EventSink,
}

impl<'a, B: WatchBackend> TreeWalker<'a, B> {
    pub fn new(
        watches: &'a mut WatchSet<B>,
        dispatcher: &'a mut Dispatcher,
        sink: &'a mut dyn EventSink,
    ) -> Self {
        Self {
            watches,
            dispatcher,
            sink,
        }
    }

    /// Walks `root` and everything below it.
    ///
    /// Directories are visited parent first, siblings in name order. Unreadable files and
    /// directories are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchError`] if a directory that still exists can't be watched, e.g.
    /// because the inotify watch limit is exhausted.
    pub fn walk(&mut self, root: &Path) -> Result<WalkStats, WatchError> {
        let mut stats = WalkStats::default();
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            match self.watches.add(&dir) {
                Ok(true) => {}
                Ok(false) => {
                    log::debug!("`{}` is already watched", dir.display());
                    continue;
                }
                Err(err) if err.is_vanished() => {
                    log::debug!("directory vanished during walk: {err}");
                    stats.skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            }
            stats.directories += 1;
            self.sink.emit(Event::PathStatus {
                path: dir.clone(),
                status: PathStatus::Initial,
            });

            let Some((files, mut children)) = list(&dir) else {
                stats.skipped += 1;
                continue;
            };
            for filename in &files {
                if is_listing_alias(filename) {
                    continue;
                }
                self.dispatcher.dispatch_logged(&dir, filename, &mut *self.sink);
                stats.files += 1;
            }

            children.reverse();
            stack.extend(children);
        }

        Ok(stats)
    }
}

/// `devices.allow` and `devices.deny` report the content of `devices.list`, which the walk
/// already reports on its own.
fn is_listing_alias(filename: &str) -> bool {
    filename != DEVICES_LIST && FileKind::for_name(filename) == Some(FileKind::DeviceAccess)
}

/// Splits the entries of `dir` into file names and child directories, both sorted.
fn list(dir: &Path) -> Option<(Vec<String>, Vec<PathBuf>)> {
    let entries = match fsutil::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.is_vanished() => {
            log::debug!("directory vanished during walk: {err}");
            return None;
        }
        Err(err) => {
            log::warn!("{err}");
            return None;
        }
    };

    let mut files = Vec::new();
    let mut children = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("failed to read entry of `{}`: {err}", dir.display());
                continue;
            }
        };
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                log::debug!("skipping `{}`: {err}", entry.path().display());
                continue;
            }
        };
        if file_type.is_dir() {
            children.push(entry.path());
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push(name),
            Err(name) => log::debug!("skipping non UTF-8 file name {name:?}"),
        }
    }

    files.sort_unstable();
    children.sort_unstable();
    Some((files, children))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::cgroup::watch::testing::FakeBackend;

    fn tree() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/nested")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("cpu.shares"), "1024\n").unwrap();
        fs::write(root.join("a/cpu.shares"), "512\n").unwrap();
        fs::write(root.join("a/nested/cgroup.procs"), "").unwrap();
        fs::write(root.join("b/tasks"), "1\n").unwrap();
        tmp
    }

    #[test]
    fn test_walk_order_and_watches() {
        let tmp = tree();
        let root = tmp.path();
        let mut watches = WatchSet::new(FakeBackend::default());
        let mut dispatcher = Dispatcher::default();
        let mut sink: Vec<Event> = Vec::new();

        let stats = TreeWalker::new(&mut watches, &mut dispatcher, &mut sink)
            .walk(root)
            .unwrap();

        assert_eq!(
            stats,
            WalkStats {
                directories: 4,
                files: 4,
                skipped: 0,
            }
        );
        for dir in ["", "a", "a/nested", "b"] {
            assert!(watches.contains(&root.join(dir)));
        }
        assert_eq!(
            sink,
            vec![
                Event::PathStatus {
                    path: root.to_path_buf(),
                    status: PathStatus::Initial,
                },
                Event::UintValue {
                    path: root.to_path_buf(),
                    filename: "cpu.shares".into(),
                    value: 1024,
                },
                Event::PathStatus {
                    path: root.join("a"),
                    status: PathStatus::Initial,
                },
                Event::UintValue {
                    path: root.join("a"),
                    filename: "cpu.shares".into(),
                    value: 512,
                },
                Event::PathStatus {
                    path: root.join("a/nested"),
                    status: PathStatus::Initial,
                },
                Event::EmptyFile {
                    path: root.join("a/nested"),
                    filename: "cgroup.procs".into(),
                },
                Event::PathStatus {
                    path: root.join("b"),
                    status: PathStatus::Initial,
                },
            ]
        );
    }

    #[test]
    fn test_bad_file_does_not_stop_walk() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("cpu.cfs_period_us"), "garbage").unwrap();
        fs::write(root.join("cpu.shares"), "2").unwrap();
        let mut watches = WatchSet::new(FakeBackend::default());
        let mut dispatcher = Dispatcher::default();
        let mut sink: Vec<Event> = Vec::new();

        TreeWalker::new(&mut watches, &mut dispatcher, &mut sink)
            .walk(root)
            .unwrap();

        assert_eq!(sink.len(), 2);
        assert!(matches!(sink[1], Event::UintValue { value: 2, .. }));
    }

    #[test]
    fn test_device_rules_are_reported_once_per_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("devices.allow"), "").unwrap();
        fs::write(root.join("devices.deny"), "").unwrap();
        fs::write(root.join(DEVICES_LIST), "a *:* rwm\n").unwrap();
        let mut watches = WatchSet::new(FakeBackend::default());
        let mut dispatcher = Dispatcher::default();
        let mut sink: Vec<Event> = Vec::new();

        let stats = TreeWalker::new(&mut watches, &mut dispatcher, &mut sink)
            .walk(root)
            .unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(sink.len(), 2);
        match &sink[1] {
            Event::DeviceAccessRule { filename, .. } => assert_eq!(filename, DEVICES_LIST),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut watches = WatchSet::new(FakeBackend::default());
        let mut dispatcher = Dispatcher::default();
        let mut sink: Vec<Event> = Vec::new();

        let stats = TreeWalker::new(&mut watches, &mut dispatcher, &mut sink)
            .walk(&tmp.path().join("gone"))
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert!(sink.is_empty());
        assert!(watches.is_empty());
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = WalkStats::default();
        total += WalkStats {
            directories: 2,
            files: 5,
            skipped: 0,
        };
        total += WalkStats {
            directories: 1,
            files: 0,
            skipped: 1,
        };
        assert_eq!(
            total,
            WalkStats {
                directories: 3,
                files: 5,
                skipped: 1,
            }
        );
    }
}
