//! Defines structured error types for parsing cgroup control files.
//!
//! Line numbers are 1-based and count every line of the file, including blank ones, so they
//! can be matched against the raw content.

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("content is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid unsigned value '{value}': {source}")]
    InvalidUnsigned {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid signed value '{value}': {source}")]
    InvalidSigned {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("expected exactly two tokens at line {line}: '{content}'")]
    MalformedPair { line: usize, content: String },

    #[error("expected `major:minor value` at line {line}: '{content}'")]
    MalformedDeviceValue { line: usize, content: String },

    #[error("expected `type major:minor access` at line {line}: '{content}'")]
    MalformedDeviceRule { line: usize, content: String },

    #[error("invalid pid at line {line}: '{value}': {source}")]
    InvalidPid {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },
}

impl ParseError {
    /// The line the error refers to, if it is a line-oriented failure.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::MalformedPair { line, .. }
            | ParseError::MalformedDeviceValue { line, .. }
            | ParseError::MalformedDeviceRule { line, .. }
            | ParseError::InvalidPid { line, .. } => Some(*line),
            ParseError::InvalidUtf8(_)
            | ParseError::InvalidUnsigned { .. }
            | ParseError::InvalidSigned { .. } => None,
        }
    }
}
