use std::fs::{File, ReadDir};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// The filesystem operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Open,
    Read,
    List,
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self {
            FileAction::Open => "open",
            FileAction::Read => "read",
            FileAction::List => "list",
        };
        write!(f, "{action}")
    }
}

/// Error that occurs when accessing a file or directory fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to {action} `{path}`: {source}")]
pub struct FileError {
    pub action: FileAction,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FileError {
    fn new(action: FileAction, path: &Path, source: io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns `true` if the target disappeared before it could be accessed.
    ///
    /// cgroup directories are removed by the kernel together with their control files, so a
    /// lookup racing with `rmdir` reports either `ENOENT` or `ENODEV`.
    pub fn is_vanished(&self) -> bool {
        const ENODEV: i32 = 19;
        self.source.kind() == io::ErrorKind::NotFound || self.source.raw_os_error() == Some(ENODEV)
    }
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use cgroup_observer::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/mountinfo")?;
/// # Ok::<(), fsutil::FileError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileError::new(FileAction::Open, path, source))?;
    Ok(BufReader::new(file))
}

/// Reads the whole file in one go.
///
/// Control files are generated by the kernel on each read, so their content is only
/// consistent within a single read.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, FileError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| FileError::new(FileAction::Read, path, source))
}

/// Lists the entries of a directory.
pub fn read_dir(path: impl AsRef<Path>) -> Result<ReadDir, FileError> {
    let path = path.as_ref();
    std::fs::read_dir(path).map_err(|source| FileError::new(FileAction::List, path, source))
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_open_file_reader_success() {
        let tmp = tempfile::NamedTempFile::new().expect("failed to create temp file");
        let reader = open_file_reader(tmp.path()).expect("should open test file");
        let metadata = reader.get_ref().metadata().unwrap();
        assert!(metadata.is_file());
    }

    #[test]
    fn test_open_file_reader_error() {
        let err = open_file_reader("/definitely/does/not/exist").unwrap_err();
        assert_eq!(err.action, FileAction::Open);
        assert_eq!(err.path, PathBuf::from("/definitely/does/not/exist"));
        assert!(err.is_vanished());
    }

    #[test]
    fn test_read_file_returns_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpu.shares");
        std::fs::write(&path, "1024\n").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"1024\n");
    }

    #[test]
    fn test_read_dir_error_mentions_action() {
        let err = read_dir("/definitely/does/not/exist").unwrap_err();
        assert_eq!(err.action, FileAction::List);
        assert!(err.to_string().starts_with("failed to list"));
    }
}
