//! Observation of cgroup v1 hierarchies.
//!
//! The flow is split in two phases sharing one [`Dispatcher`] and one [`WatchSet`]:
//!
//! - **Snapshot**: [`HierarchyEnumerator`] finds the mounted hierarchies and
//!   [`ChangeWatcher::snapshot`] walks each of them with a [`TreeWalker`], watching every
//!   directory and reporting every recognized control file.
//! - **Live**: [`ChangeWatcher::run`] consumes change notifications, keeps the watch set in
//!   step with created and removed cgroups and re-reports modified control files.
//!
//! Control files are recognized by name ([`FileKind`]) and parsed by the [`parse`] module.
//! Back-to-back identical reports are suppressed by a [`DedupCache`].
mod dedup;
mod dispatch;
mod hierarchy;
mod kind;
pub mod parse;
mod walker;
mod watch;
mod watcher;

pub use dedup::{DedupCache, Fingerprint};
pub use dispatch::{DEVICES_LIST, DispatchError, Dispatched, Dispatcher};
pub use hierarchy::{
    CgroupLineError, DEFAULT_MOUNTINFO_PATH, DEFAULT_PROC_CGROUP_PATH, Hierarchy,
    HierarchyEnumerator, HierarchyError,
};
pub use kind::{FileKind, canonical_name};
pub use walker::{TreeWalker, WalkStats};
pub use watch::{WatchBackend, WatchDescriptor, WatchError, WatchSet};
pub use watcher::{Change, ChangeWatcher, classify};
