//! Parsers turning raw control-file content into typed [`ValueRecord`]s.
//!
//! The entry point is [`parse_content`], which selects the grammar from a [`FileKind`]:
//!
//! - **Scalar files** (`Uint`, `Int`, `String`) hold one trimmed value.
//! - **Line files** (`StringPairs`, `DeviceIo`, `DeviceAccess`) hold one record per line
//!   and stop at the first malformed line, keeping what was read before it.
//! - **`cgroup.procs`** holds one pid per line.
//!
//! A file whose content is empty after trimming always yields [`ValueRecord::Empty`],
//! regardless of its kind.

mod device;
mod error;
mod lines;
mod procs;
mod scalar;

pub use device::{Access, DeviceAccessRule, DeviceIoValue, DeviceNumber, DeviceType};
pub use error::ParseError;
pub use scalar::{parse_int, parse_uint};

use std::path::Path;

use crate::event::Event;

use super::FileKind;

/// Typed content of one control file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueRecord {
    Uint(u64),
    Int(i64),
    String(String),
    StringPairs(Vec<(String, String)>),
    DeviceIo(Vec<DeviceIoValue>),
    DeviceAccess(Vec<DeviceAccessRule>),
    Pids(Vec<u32>),
    Empty,
}

/// A parse failure, with whatever records preceded the offending line.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ParseFailure {
    /// Records read before the failure; `None` if there were none.
    pub partial: Option<ValueRecord>,
    #[source]
    pub error: ParseError,
}

impl From<ParseError> for ParseFailure {
    fn from(error: ParseError) -> Self {
        Self {
            partial: None,
            error,
        }
    }
}

/// Parses `content` according to the grammar of `kind`.
///
/// # Errors
///
/// Returns a [`ParseFailure`] if the content is not UTF-8 or does not match the grammar.
/// For line files, [`ParseFailure::partial`] carries the records before the bad line.
pub fn parse_content(kind: FileKind, content: &[u8]) -> Result<ValueRecord, ParseFailure> {
    let content = std::str::from_utf8(content).map_err(ParseError::from)?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(ValueRecord::Empty);
    }

    let record = match kind {
        FileKind::Uint => ValueRecord::Uint(parse_uint(trimmed)?),
        FileKind::Int => ValueRecord::Int(parse_int(trimmed)?),
        FileKind::String => ValueRecord::String(trimmed.to_owned()),
        // Line files get the raw content so line numbers match the file.
        FileKind::StringPairs => {
            line_records(content, lines::parse_pair, ValueRecord::StringPairs)?
        }
        FileKind::DeviceIo => line_records(content, device::parse_device_io, ValueRecord::DeviceIo)?,
        FileKind::DeviceAccess => {
            line_records(content, device::parse_device_rule, ValueRecord::DeviceAccess)?
        }
        FileKind::Procs => ValueRecord::Pids(procs::parse_pids(content)?),
    };
    Ok(record)
}

fn line_records<T>(
    content: &str,
    parse_line: fn(&str, usize) -> Result<T, ParseError>,
    wrap: fn(Vec<T>) -> ValueRecord,
) -> Result<ValueRecord, ParseFailure> {
    match lines::parse_lines(content, parse_line) {
        Ok(records) => Ok(wrap(records)),
        Err(truncated) => Err(ParseFailure {
            partial: (!truncated.records.is_empty()).then(|| wrap(truncated.records)),
            error: truncated.error,
        }),
    }
}

impl ValueRecord {
    /// Expands the record into the events reported for `filename` in directory `path`.
    ///
    /// Multi-record files produce one event per record, and a record set without entries
    /// is reported as a single [`Event::EmptyFile`].
    pub fn into_events(self, path: &Path, filename: &str) -> Vec<Event> {
        let path = path.to_path_buf();
        let filename = filename.to_owned();
        let empty = |path, filename| vec![Event::EmptyFile { path, filename }];

        match self {
            ValueRecord::Uint(value) => vec![Event::UintValue {
                path,
                filename,
                value,
            }],
            ValueRecord::Int(value) => vec![Event::IntValue {
                path,
                filename,
                value,
            }],
            ValueRecord::String(value) => vec![Event::StringValue {
                path,
                filename,
                value,
            }],
            ValueRecord::StringPairs(pairs) if pairs.is_empty() => empty(path, filename),
            ValueRecord::StringPairs(pairs) => pairs
                .into_iter()
                .map(|(key, value)| Event::StringPairValue {
                    path: path.clone(),
                    filename: filename.clone(),
                    key,
                    value,
                })
                .collect(),
            ValueRecord::DeviceIo(values) if values.is_empty() => empty(path, filename),
            ValueRecord::DeviceIo(values) => values
                .into_iter()
                .map(|v| Event::DeviceIoValue {
                    path: path.clone(),
                    filename: filename.clone(),
                    major: v.major,
                    minor: v.minor,
                    value: v.value,
                })
                .collect(),
            ValueRecord::DeviceAccess(rules) if rules.is_empty() => empty(path, filename),
            ValueRecord::DeviceAccess(rules) => rules
                .into_iter()
                .map(|rule| Event::DeviceAccessRule {
                    path: path.clone(),
                    filename: filename.clone(),
                    devtype: rule.devtype.to_string(),
                    major: rule.major.to_string(),
                    minor: rule.minor.to_string(),
                    access: rule.access.to_string(),
                })
                .collect(),
            ValueRecord::Pids(pids) if pids.is_empty() => empty(path, filename),
            ValueRecord::Pids(pids) => vec![Event::AttachedPids { path, pids }],
            ValueRecord::Empty => empty(path, filename),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_zero_length_file_is_empty_for_every_kind() {
        for kind in [
            FileKind::Uint,
            FileKind::Int,
            FileKind::String,
            FileKind::StringPairs,
            FileKind::DeviceIo,
            FileKind::DeviceAccess,
            FileKind::Procs,
        ] {
            assert_eq!(parse_content(kind, b"").unwrap(), ValueRecord::Empty);
            assert_eq!(parse_content(kind, b" \n\n").unwrap(), ValueRecord::Empty);
        }
    }

    #[test]
    fn test_string_is_trimmed() {
        let record = parse_content(FileKind::String, b"0-3,5\n").unwrap();
        assert_eq!(record, ValueRecord::String("0-3,5".to_owned()));
    }

    #[test]
    fn test_string_pairs_keep_prefix_on_failure() {
        let failure = parse_content(FileKind::StringPairs, b"foo bar\nmalformed").unwrap_err();
        assert_eq!(
            failure.partial,
            Some(ValueRecord::StringPairs(vec![("foo".into(), "bar".into())]))
        );
        assert_eq!(failure.error.line(), Some(2));
    }

    #[test]
    fn test_line_numbers_count_leading_blank_lines() {
        let failure = parse_content(FileKind::StringPairs, b"\n\nfoo bar\nbad\n").unwrap_err();
        assert_eq!(failure.error.line(), Some(4));

        let failure = parse_content(FileKind::Procs, b"\n1\nx\n").unwrap_err();
        assert_eq!(failure.error.line(), Some(3));
    }

    #[test]
    fn test_failure_on_first_line_has_no_partial() {
        let failure = parse_content(FileKind::DeviceAccess, b"a 8:0\n").unwrap_err();
        assert!(failure.partial.is_none());
        assert!(matches!(
            failure.error,
            ParseError::MalformedDeviceRule { line: 1, .. }
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let failure = parse_content(FileKind::String, &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(failure.error, ParseError::InvalidUtf8(_)));
    }

    #[test]
    fn test_uint_saturates_through_parse_content() {
        let record = parse_content(FileKind::Uint, b"-4096\n").unwrap();
        assert_eq!(record, ValueRecord::Uint(0));
    }

    #[test]
    fn test_pairs_expand_to_one_event_each() {
        let record = parse_content(FileKind::StringPairs, b"oom_kill_disable 0\nunder_oom 0\n")
            .unwrap();
        let events = record.into_events(Path::new("/cg/memory"), "memory.oom_control");
        assert_eq!(
            events,
            vec![
                Event::StringPairValue {
                    path: PathBuf::from("/cg/memory"),
                    filename: "memory.oom_control".into(),
                    key: "oom_kill_disable".into(),
                    value: "0".into(),
                },
                Event::StringPairValue {
                    path: PathBuf::from("/cg/memory"),
                    filename: "memory.oom_control".into(),
                    key: "under_oom".into(),
                    value: "0".into(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_record_expands_to_single_empty_file_event() {
        let events = ValueRecord::Empty.into_events(Path::new("/cg"), "cgroup.procs");
        assert_eq!(
            events,
            vec![Event::EmptyFile {
                path: PathBuf::from("/cg"),
                filename: "cgroup.procs".into(),
            }]
        );
    }

    #[test]
    fn test_device_rules_expand_to_strings() {
        let record = parse_content(FileKind::DeviceAccess, b"a *:* rwm\n").unwrap();
        let events = record.into_events(Path::new("/cg/devices"), "devices.allow");
        assert_eq!(
            events,
            vec![Event::DeviceAccessRule {
                path: PathBuf::from("/cg/devices"),
                filename: "devices.allow".into(),
                devtype: "a".into(),
                major: "*".into(),
                minor: "*".into(),
                access: "rwm".into(),
            }]
        );
    }
}
