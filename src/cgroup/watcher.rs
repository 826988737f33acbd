use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::EventKind;
use tokio::sync::mpsc;

use crate::error::ResultOkLogExt;
use crate::event::{Event, EventSink, PathStatus};
use crate::fsutil;

use super::dispatch::Dispatcher;
use super::hierarchy::Hierarchy;
use super::walker::{TreeWalker, WalkStats};
use super::watch::{WatchBackend, WatchError, WatchSet};

/// A change of the cgroup tree relevant to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    DirCreated(PathBuf),
    DirRemoved(PathBuf),
    FileChanged { dir: PathBuf, filename: String },
    /// Source of a rename; the path no longer exists.
    MovedFrom(PathBuf),
    /// Destination of a rename, either a cgroup directory or a file.
    MovedTo(PathBuf),
}

/// Maps a backend notification to tree changes.
///
/// Access and metadata notifications carry no new content and map to nothing.
pub fn classify(event: &notify::Event) -> Vec<Change> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => event
            .paths
            .iter()
            .cloned()
            .map(Change::DirCreated)
            .collect(),
        EventKind::Remove(RemoveKind::Folder) => event
            .paths
            .iter()
            .cloned()
            .map(Change::DirRemoved)
            .collect(),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
            event.paths.iter().filter_map(|p| file_changed(p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .cloned()
            .map(Change::MovedFrom)
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().cloned().map(Change::MovedTo).collect()
        }
        // A paired rename lists the source first and the destination last.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, .., to] => vec![
                Change::MovedFrom(from.clone()),
                Change::MovedTo(to.clone()),
            ],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn file_changed(path: &Path) -> Option<Change> {
    let dir = path.parent()?;
    let filename = path.file_name()?.to_str()?;
    Some(Change::FileChanged {
        dir: dir.to_path_buf(),
        filename: filename.to_owned(),
    })
}

/// Keeps the watch set in step with the cgroup tree and reports what changes in it.
///
/// The watcher owns the only [`Dispatcher`] and therefore the only dedup cache of the
/// observer; the snapshot and the live phase share them.
pub struct ChangeWatcher<B, S> {
    watches: WatchSet<B>,
    dispatcher: Dispatcher,
    sink: S,
}

impl<B: WatchBackend, S: EventSink> ChangeWatcher<B, S> {
    pub fn new(watches: WatchSet<B>, dispatcher: Dispatcher, sink: S) -> Self {
        Self {
            watches,
            dispatcher,
            sink,
        }
    }

    pub fn watches(&self) -> &WatchSet<B> {
        &self.watches
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Reports the subsystem roots of each hierarchy and walks its tree.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchError`] if an existing directory can't be watched.
    pub fn snapshot(&mut self, hierarchies: &[Hierarchy]) -> Result<WalkStats, WatchError> {
        let mut total = WalkStats::default();
        for hierarchy in hierarchies {
            for subsystem in &hierarchy.subsystems {
                self.sink.emit(Event::SubsystemRoot {
                    mountpoint: hierarchy.mountpoint.clone(),
                    subsystem: subsystem.clone(),
                });
            }
            let stats = TreeWalker::new(&mut self.watches, &mut self.dispatcher, &mut self.sink)
                .walk(&hierarchy.mountpoint)?;
            log::info!(
                "walked `{}`: {} directories, {} files, {} skipped",
                hierarchy.mountpoint.display(),
                stats.directories,
                stats.files,
                stats.skipped
            );
            total += stats;
        }
        Ok(total)
    }

    /// Consumes backend notifications until every sender is gone.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<notify::Result<notify::Event>>) {
        while let Some(notification) = rx.recv().await {
            self.handle(notification);
        }
        log::info!("notification channel closed, stopping change watcher");
    }

    /// Applies one backend notification.
    pub fn handle(&mut self, notification: notify::Result<notify::Event>) {
        match notification {
            Ok(event) => {
                for change in classify(&event) {
                    self.apply(change);
                }
            }
            Err(err) => log::error!("watch backend error: {err}"),
        }
    }

    pub fn apply(&mut self, change: Change) {
        log::trace!("{change:?}");
        match change {
            Change::DirCreated(path) => self.dir_created(path),
            Change::DirRemoved(path) => self.dir_removed(&path),
            Change::FileChanged { dir, filename } => self.dispatch_if_watched(&dir, &filename),
            // Only watched paths are directories; a renamed file needs no bookkeeping.
            Change::MovedFrom(path) => self.dir_removed(&path),
            Change::MovedTo(path) if path.is_dir() => self.dir_created(path),
            Change::MovedTo(path) => {
                let filename = path.file_name().and_then(|name| name.to_str());
                if let (Some(dir), Some(filename)) = (path.parent(), filename) {
                    self.dispatch_if_watched(dir, filename);
                }
            }
        }
    }

    fn dispatch_if_watched(&mut self, dir: &Path, filename: &str) {
        if self.watches.contains(dir) {
            self.dispatcher.dispatch_logged(dir, filename, &mut self.sink);
        } else {
            log::trace!("ignoring `{filename}` in unwatched `{}`", dir.display());
        }
    }

    /// Watches and announces `path`, then any directories already created inside it.
    fn dir_created(&mut self, path: PathBuf) {
        let mut pending = vec![path];
        while let Some(dir) = pending.pop() {
            match self.watches.add(&dir) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) if err.is_vanished() => {
                    log::debug!("created directory vanished: {err}");
                    continue;
                }
                Err(err) => {
                    log::warn!("{err}");
                    continue;
                }
            }
            self.sink.emit(Event::PathStatus {
                path: dir.clone(),
                status: PathStatus::Created,
            });

            // Subdirectories made before the watch existed produce no notification.
            if let Some(entries) = fsutil::read_dir(&dir).ok_log(log::Level::Debug) {
                let mut children: Vec<PathBuf> = entries
                    .flatten()
                    .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
                    .map(|entry| entry.path())
                    .collect();
                children.sort_unstable_by(|a, b| b.cmp(a));
                pending.extend(children);
            }
        }
    }

    /// Drops the watches of `path` and its descendants, deepest first.
    fn dir_removed(&mut self, path: &Path) {
        if !self.watches.contains(path) {
            log::trace!("ignoring removal of unwatched `{}`", path.display());
            return;
        }

        let mut removed = self.watches.descendants_of(path);
        removed.reverse();
        removed.push(path.to_path_buf());
        for dir in removed {
            if self.watches.remove(&dir).is_some() {
                self.sink.emit(Event::PathStatus {
                    path: dir,
                    status: PathStatus::Removed,
                });
            }
        }
    }
}
