//! cgroup observer: reports the cgroup v1 tree of a Linux host as a stream of events.
//!
//! The observer takes a snapshot of every mounted cgroup v1 hierarchy and then follows
//! cgroups being created and removed and control files being written, reporting each
//! change to an [`event::EventSink`]. The cgroup filesystem is only ever read.

use cgroup::{
    ChangeWatcher, DedupCache, Dispatcher, HierarchyEnumerator, WatchError, WatchSet,
};
use event::{EventSink, JsonLinesSink, LogSink};
use tokio::sync::mpsc::{self, error::TrySendError};

pub mod cgroup;
pub mod config;
pub mod error;
pub mod event;
pub mod fsutil;
pub mod mountinfo;

pub use config::{Config, OutputFormat};
pub use error::{Error, Result};

/// Runs the observer until the notification backend shuts down.
///
/// Discovers the hierarchies, walks them on a blocking thread while installing a watch on
/// every directory, and then hands the watch set to a task that processes change
/// notifications one at a time. Notifications that arrive during the walk are queued and
/// handled afterwards; when the queue is full they are dropped with a warning.
///
/// # Errors
///
/// - [`Error::Hierarchy`] if no cgroup v1 hierarchy can be discovered.
/// - [`Error::WatcherInit`] if the notification backend can't be created.
/// - [`Error::InitialWatch`] if an existing directory can't be watched.
/// - [`Error::Join`] if the snapshot or the live task panics.
pub async fn run(config: Config) -> Result<()> {
    let sink: Box<dyn EventSink + Send> = match config.output {
        OutputFormat::Log => Box::new(LogSink),
        OutputFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    let hierarchies =
        HierarchyEnumerator::new(config.mountinfo_path, config.proc_cgroup_path).enumerate()?;
    for hierarchy in &hierarchies {
        log::debug!(
            "found hierarchy `{}` with {:?}",
            hierarchy.mountpoint.display(),
            hierarchy.subsystems
        );
    }

    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let backend = notify::recommended_watcher(move |notification: notify::Result<notify::Event>| {
        if let Err(TrySendError::Full(_)) = tx.try_send(notification) {
            log::warn!("notification queue is full, dropping change notification");
        }
    })
    .map_err(Error::WatcherInit)?;

    let dispatcher = Dispatcher::new(DedupCache::new());
    let mut watcher = ChangeWatcher::new(WatchSet::new(backend), dispatcher, sink);
    let mut watcher = tokio::task::spawn_blocking(move || {
        let stats = watcher.snapshot(&hierarchies)?;
        log::info!(
            "snapshot complete: {} directories, {} files, {} skipped",
            stats.directories,
            stats.files,
            stats.skipped
        );
        Ok::<_, WatchError>(watcher)
    })
    .await??;

    tokio::spawn(async move { watcher.run(rx).await }).await?;
    Ok(())
}
