use super::ParseError;

/// Parses the pid listing of `cgroup.procs`, one pid per line, in listing order.
pub fn parse_pids(content: &str) -> Result<Vec<u32>, ParseError> {
    let mut pids = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let pid = line.parse::<u32>().map_err(|source| ParseError::InvalidPid {
            value: line.to_owned(),
            line: idx + 1,
            source,
        })?;
        pids.push(pid);
    }
    Ok(pids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pids() {
        assert_eq!(parse_pids("1\n7\n42\n").unwrap(), vec![1, 7, 42]);
    }

    #[test]
    fn test_parse_pids_empty() {
        assert!(parse_pids("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_pids_invalid() {
        let err = parse_pids("1\nnope\n").unwrap_err();
        match err {
            ParseError::InvalidPid { value, line, .. } => {
                assert_eq!(value, "nope");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
