//! Structured records describing the cgroup tree and its changes.
//!
//! Every record produced by the snapshot and live phases is an [`Event`]. Field order within
//! each variant is part of the output contract: sinks that serialize events positionally rely
//! on it.

mod sink;

pub use sink::{EventSink, JsonLinesSink, LogSink};

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Lifecycle status attached to a cgroup directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "i32")]
pub enum PathStatus {
    /// Seen during the initial snapshot.
    Initial,
    /// Created while watching.
    Created,
    /// Removed while watching.
    Removed,
}

impl From<PathStatus> for i32 {
    fn from(status: PathStatus) -> Self {
        match status {
            PathStatus::Initial => 0,
            PathStatus::Created => 1,
            PathStatus::Removed => -1,
        }
    }
}

/// A single record handed to an [`EventSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SubsystemRoot {
        mountpoint: PathBuf,
        subsystem: String,
    },
    PathStatus {
        path: PathBuf,
        status: PathStatus,
    },
    UintValue {
        path: PathBuf,
        filename: String,
        value: u64,
    },
    IntValue {
        path: PathBuf,
        filename: String,
        value: i64,
    },
    StringValue {
        path: PathBuf,
        filename: String,
        value: String,
    },
    /// One event per pair of a key/value file.
    StringPairValue {
        path: PathBuf,
        filename: String,
        key: String,
        value: String,
    },
    DeviceIoValue {
        path: PathBuf,
        filename: String,
        major: i64,
        minor: i64,
        value: u64,
    },
    DeviceAccessRule {
        path: PathBuf,
        filename: String,
        devtype: String,
        major: String,
        minor: String,
        access: String,
    },
    AttachedPids {
        path: PathBuf,
        pids: Vec<u32>,
    },
    /// A recognized file was present but carried no records.
    EmptyFile {
        path: PathBuf,
        filename: String,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::SubsystemRoot {
                mountpoint,
                subsystem,
            } => write!(f, "subsystem_root {} {subsystem}", mountpoint.display()),
            Event::PathStatus { path, status } => {
                write!(f, "path_status {} {}", path.display(), i32::from(*status))
            }
            Event::UintValue {
                path,
                filename,
                value,
            } => write!(f, "uint_value {} {filename} {value}", path.display()),
            Event::IntValue {
                path,
                filename,
                value,
            } => write!(f, "int_value {} {filename} {value}", path.display()),
            Event::StringValue {
                path,
                filename,
                value,
            } => write!(f, "string_value {} {filename} {value:?}", path.display()),
            Event::StringPairValue {
                path,
                filename,
                key,
                value,
            } => write!(
                f,
                "string_pair_value {} {filename} {key} {value}",
                path.display()
            ),
            Event::DeviceIoValue {
                path,
                filename,
                major,
                minor,
                value,
            } => write!(
                f,
                "device_io_value {} {filename} {major}:{minor} {value}",
                path.display()
            ),
            Event::DeviceAccessRule {
                path,
                filename,
                devtype,
                major,
                minor,
                access,
            } => write!(
                f,
                "device_access_rule {} {filename} {devtype} {major}:{minor} {access}",
                path.display()
            ),
            Event::AttachedPids { path, pids } => {
                write!(f, "attached_pids {} {pids:?}", path.display())
            }
            Event::EmptyFile { path, filename } => {
                write!(f, "empty_file {} {filename}", path.display())
            }
        }
    }
}
