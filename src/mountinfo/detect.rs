use crate::fsutil;

use super::parser::parse_mount_info_line;
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// A cgroup v1 hierarchy mount as listed in `mountinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupMount {
    /// Where the hierarchy is mounted.
    pub mount_point: PathBuf,
    /// Superblock options, e.g. `["rw", "cpu", "cpuacct"]`.
    pub super_options: Vec<String>,
}

/// Detects all cgroup v1 mounts by parsing a Linux `mountinfo` file.
///
/// Entries are returned in file order. Only filesystems of type `cgroup` are considered;
/// `cgroup2` mounts are skipped.
///
/// # Arguments
///
/// * `path` - Path to a Linux mountinfo file (e.g., `/proc/self/mountinfo`).
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
///
/// # Example
///
/// ```no_run
/// use cgroup_observer::mountinfo::detect_cgroup_v1_mounts;
///
/// for mount in detect_cgroup_v1_mounts("/proc/self/mountinfo").unwrap() {
///     println!("{} {:?}", mount.mount_point.display(), mount.super_options);
/// }
/// ```
pub fn detect_cgroup_v1_mounts(path: impl AsRef<Path>) -> Result<Vec<CgroupMount>> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    detect_cgroup_v1_mounts_from_reader(buf, path)
}

/// Internal implementation for detecting cgroup v1 mounts from a reader.
///
/// `origin` is the logical origin of the data, used in error messages.
fn detect_cgroup_v1_mounts_from_reader<R: BufRead>(
    mut reader: R,
    origin: &Path,
) -> Result<Vec<CgroupMount>> {
    let mut line = String::with_capacity(256);
    let mut lineno = 0;
    let mut mounts = Vec::new();

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        lineno += 1;
        if line.trim().is_empty() {
            line.clear();
            continue;
        }

        let mount_info = parse_mount_info_line(line.as_str()).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            line: lineno,
            source,
        })?;
        if mount_info.fs_type == "cgroup" {
            log::debug!(
                "Found `cgroup` mount point with root `{}`: {}",
                mount_info.root,
                mount_info.mount_point
            );
            mounts.push(CgroupMount {
                mount_point: PathBuf::from(mount_info.mount_point.as_ref()),
                super_options: mount_info.super_options().map(str::to_owned).collect(),
            });
        }

        line.clear();
    }

    Ok(mounts)
}
