//! Line-oriented control files.
//!
//! Each non-empty line yields one record. Parsing stops at the first line that does not
//! match the grammar; the records read up to that point are kept alongside the error so
//! they can still be reported.

use super::ParseError;

/// Records read before a malformed line, together with the error for that line.
#[derive(Debug)]
pub struct Truncated<T> {
    pub records: Vec<T>,
    pub error: ParseError,
}

/// Applies `parse_line` to every non-empty line of `content`.
///
/// `parse_line` receives the trimmed line and its 1-based line number.
pub fn parse_lines<T>(
    content: &str,
    mut parse_line: impl FnMut(&str, usize) -> Result<T, ParseError>,
) -> Result<Vec<T>, Truncated<T>> {
    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line, idx + 1) {
            Ok(record) => records.push(record),
            Err(error) => return Err(Truncated { records, error }),
        }
    }
    Ok(records)
}

/// Parses a `key value` line, e.g. `oom_kill_disable 0` or `eth0 5`.
pub fn parse_pair(line: &str, lineno: usize) -> Result<(String, String), ParseError> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(key), Some(value), None) => Ok((key.to_owned(), value.to_owned())),
        _ => Err(ParseError::MalformedPair {
            line: lineno,
            content: line.to_owned(),
        }),
    }
}
