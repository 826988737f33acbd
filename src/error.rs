use crate::cgroup::{HierarchyError, WatchError};
use crate::config;

/// Errors that prevent the observer from starting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error("failed to discover cgroup hierarchies: {0}")]
    Hierarchy(#[from] HierarchyError),
    #[error("failed to create change notification backend: {0}")]
    WatcherInit(#[source] notify::Error),
    #[error("snapshot failed: {0}")]
    InitialWatch(#[from] WatchError),
    #[error("snapshot task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    /// Converts the result into an option, logging the error at `level`.
    fn ok_log(self, level: log::Level) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self, level: log::Level) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::log!(level, "{err}");
                None
            }
        }
    }
}
