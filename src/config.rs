use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cgroup::{DEFAULT_MOUNTINFO_PATH, DEFAULT_PROC_CGROUP_PATH};

pub const MOUNTINFO_VAR: &str = "CGROUP_OBSERVER_MOUNTINFO";
pub const PROC_CGROUP_VAR: &str = "CGROUP_OBSERVER_PROC_CGROUP";
pub const OUTPUT_VAR: &str = "CGROUP_OBSERVER_OUTPUT";
pub const QUEUE_CAPACITY_VAR: &str = "CGROUP_OBSERVER_QUEUE_CAPACITY";

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{var}` is not valid unicode")]
    NotUnicode { var: &'static str },
    #[error("invalid output format `{0}`, expected `log` or `json`")]
    InvalidOutput(String),
    #[error("environment variable `{var}` must be a positive integer, got `{value}`")]
    InvalidCapacity { var: &'static str, value: String },
}

/// Where events are written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Log records at info level.
    #[default]
    Log,
    /// One JSON object per line on stdout.
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(OutputFormat::Log),
            "json" => Ok(OutputFormat::Json),
            _ => Err(Error::InvalidOutput(s.to_owned())),
        }
    }
}

/// Runtime settings of the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mountinfo_path: PathBuf,
    pub proc_cgroup_path: PathBuf,
    pub output: OutputFormat,
    /// Capacity of the queue between the notification backend and the change watcher.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mountinfo_path: PathBuf::from(DEFAULT_MOUNTINFO_PATH),
            proc_cgroup_path: PathBuf::from(DEFAULT_PROC_CGROUP_PATH),
            output: OutputFormat::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    /// Reads the configuration from `CGROUP_OBSERVER_*` environment variables, falling back
    /// to the defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|var| std::env::var_os(var))
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self, Error> {
        let mut config = Config::default();

        if let Some(path) = lookup(MOUNTINFO_VAR) {
            config.mountinfo_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(PROC_CGROUP_VAR) {
            config.proc_cgroup_path = PathBuf::from(path);
        }
        if let Some(output) = lookup(OUTPUT_VAR) {
            config.output = unicode(OUTPUT_VAR, output)?.parse()?;
        }
        if let Some(capacity) = lookup(QUEUE_CAPACITY_VAR) {
            let capacity = unicode(QUEUE_CAPACITY_VAR, capacity)?;
            config.queue_capacity = match capacity.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::InvalidCapacity {
                        var: QUEUE_CAPACITY_VAR,
                        value: capacity,
                    });
                }
            };
        }

        Ok(config)
    }
}

fn unicode(var: &'static str, value: OsString) -> Result<String, Error> {
    value.into_string().map_err(|_| Error::NotUnicode { var })
}
