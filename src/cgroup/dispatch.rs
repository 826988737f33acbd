use std::path::{Path, PathBuf};

use crate::event::EventSink;
use crate::fsutil::{self, FileError};

use super::dedup::{DedupCache, Fingerprint};
use super::parse::{self, ParseError, ValueRecord};
use super::FileKind;

/// Listing read for every device access control file; `devices.allow` and `devices.deny`
/// are write-only. A write to either is reported under its own name, the snapshot walk
/// only reports the listing itself.
pub const DEVICES_LIST: &str = "devices.list";

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Events were handed to the sink.
    Emitted,
    /// Identical to the previous report; nothing was emitted.
    Suppressed,
    /// The file is not a recognized control file.
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Io(#[from] FileError),
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl DispatchError {
    /// Returns `true` if the file disappeared, typically because its cgroup was removed.
    pub fn is_vanished(&self) -> bool {
        matches!(self, DispatchError::Io(err) if err.is_vanished())
    }
}

/// Routes control files to their parser and forwards the result to a sink.
#[derive(Debug, Default)]
pub struct Dispatcher {
    dedup: DedupCache,
}

impl Dispatcher {
    pub fn new(dedup: DedupCache) -> Self {
        Self { dedup }
    }

    /// Reads, parses and reports `filename` in cgroup directory `dir`.
    ///
    /// Files with an unknown name are ignored. For line-oriented files the records before a
    /// malformed line are still reported before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Io`] if the file (or `devices.list`) cannot be read.
    /// - [`DispatchError::Parse`] if the content does not match the file's grammar.
    pub fn dispatch(
        &mut self,
        dir: &Path,
        filename: &str,
        sink: &mut dyn EventSink,
    ) -> Result<Dispatched, DispatchError> {
        let Some(kind) = FileKind::for_name(filename) else {
            return Ok(Dispatched::Ignored);
        };

        let source = match kind {
            FileKind::DeviceAccess => dir.join(DEVICES_LIST),
            _ => dir.join(filename),
        };
        let content = fsutil::read_file(&source)?;

        match parse::parse_content(kind, &content) {
            Ok(record) => {
                let fingerprint = match (&kind, &record) {
                    (FileKind::Procs, ValueRecord::Pids(pids)) => {
                        Fingerprint::of_pid_count(dir, filename, pids.len())
                    }
                    (FileKind::Procs, _) => Fingerprint::of_pid_count(dir, filename, 0),
                    _ => Fingerprint::of_content(dir, filename, &content),
                };
                Ok(self.forward(fingerprint, dir, filename, record, sink))
            }
            Err(failure) => {
                if let Some(partial) = failure.partial {
                    let fingerprint = Fingerprint::of_content(dir, filename, &content);
                    self.forward(fingerprint, dir, filename, partial, sink);
                }
                Err(DispatchError::Parse {
                    path: source,
                    source: failure.error,
                })
            }
        }
    }

    /// Like [`Dispatcher::dispatch`], but logs failures instead of returning them.
    ///
    /// Files that vanished mid-read are expected while cgroups are torn down and are only
    /// logged at debug level.
    pub fn dispatch_logged(&mut self, dir: &Path, filename: &str, sink: &mut dyn EventSink) {
        match self.dispatch(dir, filename, sink) {
            Ok(outcome) => {
                log::trace!("{}/{filename}: {outcome:?}", dir.display());
            }
            Err(err) if err.is_vanished() => log::debug!("skipping vanished file: {err}"),
            Err(err) => log::warn!("{err}"),
        }
    }

    fn forward(
        &mut self,
        fingerprint: Fingerprint,
        dir: &Path,
        filename: &str,
        record: ValueRecord,
        sink: &mut dyn EventSink,
    ) -> Dispatched {
        if !self.dedup.check_and_update(fingerprint) {
            return Dispatched::Suppressed;
        }
        for event in record.into_events(dir, filename) {
            sink.emit(event);
        }
        Dispatched::Emitted
    }
}
