//! Single-value control files such as `cpu.shares`, `memory.limit_in_bytes` or
//! `cpuset.cpus`.
//!
//! Callers pass the trimmed, non-empty content; empty files never reach these parsers.

use std::num::IntErrorKind;

use super::ParseError;

/// Parses an unsigned value, saturating negative input to zero.
///
/// Some memory statistics can be reported as negative numbers due to kernel accounting bugs.
/// Those are clamped to `0`, including values below `i64::MIN`.
pub fn parse_uint(value: &str) -> Result<u64, ParseError> {
    match value.parse::<u64>() {
        Ok(parsed) => Ok(parsed),
        Err(source) => match value.parse::<i64>() {
            Ok(signed) if signed <= 0 => Ok(0),
            Err(err) if *err.kind() == IntErrorKind::NegOverflow => Ok(0),
            _ => Err(ParseError::InvalidUnsigned {
                value: value.to_owned(),
                source,
            }),
        },
    }
}

pub fn parse_int(value: &str) -> Result<i64, ParseError> {
    value
        .parse::<i64>()
        .map_err(|source| ParseError::InvalidSigned {
            value: value.to_owned(),
            source,
        })
}
