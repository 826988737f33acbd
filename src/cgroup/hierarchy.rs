use std::collections::{BTreeSet, HashSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::fsutil::{self, FileError};
use crate::mountinfo::{self, CgroupMount};

pub const DEFAULT_MOUNTINFO_PATH: &str = "/proc/self/mountinfo";
pub const DEFAULT_PROC_CGROUP_PATH: &str = "/proc/self/cgroup";

/// A mounted cgroup v1 hierarchy and the subsystems attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    pub mountpoint: PathBuf,
    /// Controllers bound to the hierarchy, e.g. `["cpu", "cpuacct"]` or `["name=systemd"]`.
    pub subsystems: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CgroupLineError {
    #[error("invalid cgroup line format: {0}")]
    InvalidFormat(String),
    #[error("invalid hierarchy id in cgroup line: {0}")]
    InvalidHierarchyId(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error(transparent)]
    Mountinfo(#[from] mountinfo::Error),
    #[error(transparent)]
    ProcCgroup(#[from] FileError),
    #[error("failed to read line from `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{path}` line {line}: {source}")]
    CgroupLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: CgroupLineError,
    },
    #[error("no cgroup v1 hierarchy is mounted")]
    NoHierarchies,
}

#[derive(Debug, PartialEq, Eq)]
struct CgroupLine<'a> {
    hierarchy_id: u32,
    controllers: Vec<&'a str>,
    cgroup_path: &'a str,
}

/// Parses one `/proc/<pid>/cgroup` line of the form `hierarchy-id:controller-list:cgroup-path`.
///
/// The path is the remainder of the line and may itself contain `:`.
fn parse_cgroup_line(line: &str) -> Result<CgroupLine<'_>, CgroupLineError> {
    let mut it = line.splitn(3, ':');
    let hierarchy_id = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?
        .parse::<u32>()
        .map_err(|_| CgroupLineError::InvalidHierarchyId(line.to_owned()))?;
    let controllers = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?;
    let controllers: Vec<&str> = if controllers.is_empty() {
        Vec::default()
    } else {
        controllers.split(',').collect()
    };
    let cgroup_path = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?;

    Ok(CgroupLine {
        hierarchy_id,
        controllers,
        cgroup_path: cgroup_path.trim(),
    })
}

/// Reads the v1 controllers the process is attached to.
///
/// The unified (v2) entry `0::<path>` has no controllers and contributes nothing.
fn attached_controllers<R: BufRead>(
    mut reader: R,
    origin: &Path,
) -> Result<HashSet<String>, HierarchyError> {
    let mut controllers = HashSet::new();
    let mut line = String::with_capacity(128);
    let mut lineno = 0;

    while reader
        .read_line(&mut line)
        .map_err(|source| HierarchyError::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        lineno += 1;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let parsed =
                parse_cgroup_line(trimmed).map_err(|source| HierarchyError::CgroupLine {
                    path: origin.to_path_buf(),
                    line: lineno,
                    source,
                })?;
            log::trace!(
                "hierarchy {} at {}: {:?}",
                parsed.hierarchy_id,
                parsed.cgroup_path,
                parsed.controllers
            );
            controllers.extend(parsed.controllers.into_iter().map(str::to_owned));
        }
        line.clear();
    }

    Ok(controllers)
}

/// Discovers the mounted cgroup v1 hierarchies the process can observe.
#[derive(Debug, Clone)]
pub struct HierarchyEnumerator {
    mountinfo_path: PathBuf,
    proc_cgroup_path: PathBuf,
}

impl Default for HierarchyEnumerator {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNTINFO_PATH, DEFAULT_PROC_CGROUP_PATH)
    }
}

impl HierarchyEnumerator {
    pub fn new(mountinfo_path: impl Into<PathBuf>, proc_cgroup_path: impl Into<PathBuf>) -> Self {
        Self {
            mountinfo_path: mountinfo_path.into(),
            proc_cgroup_path: proc_cgroup_path.into(),
        }
    }

    /// Lists the hierarchies in mount order, one per distinct mountpoint.
    ///
    /// A mount's subsystems are its superblock options that name a controller the process
    /// is attached to. Mounts with no such option are skipped.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::Mountinfo`] if the mount table can't be read or parsed.
    /// - [`HierarchyError::ProcCgroup`], [`HierarchyError::ReadLine`] or
    ///   [`HierarchyError::CgroupLine`] if the process cgroup file can't be read or parsed.
    /// - [`HierarchyError::NoHierarchies`] if nothing is left to observe.
    pub fn enumerate(&self) -> Result<Vec<Hierarchy>, HierarchyError> {
        let mounts = mountinfo::detect_cgroup_v1_mounts(&self.mountinfo_path)?;
        let reader = fsutil::open_file_reader(&self.proc_cgroup_path)?;
        let controllers = attached_controllers(reader, &self.proc_cgroup_path)?;

        let hierarchies = select_hierarchies(mounts, &controllers);
        if hierarchies.is_empty() {
            return Err(HierarchyError::NoHierarchies);
        }
        Ok(hierarchies)
    }
}

fn select_hierarchies(mounts: Vec<CgroupMount>, controllers: &HashSet<String>) -> Vec<Hierarchy> {
    let mut seen = BTreeSet::new();
    let mut hierarchies = Vec::new();

    for mount in mounts {
        let subsystems: Vec<String> = mount
            .super_options
            .into_iter()
            .filter(|opt| controllers.contains(opt))
            .collect();
        if subsystems.is_empty() {
            log::debug!(
                "skipping cgroup mount `{}` without attached controllers",
                mount.mount_point.display()
            );
            continue;
        }
        if !seen.insert(mount.mount_point.clone()) {
            log::debug!(
                "skipping duplicate mount of `{}`",
                mount.mount_point.display()
            );
            continue;
        }
        hierarchies.push(Hierarchy {
            mountpoint: mount.mount_point,
            subsystems,
        });
    }

    hierarchies
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MOUNTINFO: &str = "\
25 30 0:23 / /sys rw,nosuid,nodev,noexec,relatime shared:7 - sysfs sysfs rw
33 25 0:28 / /sys/fs/cgroup ro,nosuid,nodev,noexec shared:9 - tmpfs tmpfs ro,mode=755
34 33 0:29 / /sys/fs/cgroup/systemd rw,nosuid,nodev,noexec,relatime shared:10 - cgroup cgroup rw,xattr,name=systemd
37 33 0:32 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid,nodev,noexec,relatime shared:14 - cgroup cgroup rw,cpu,cpuacct
38 33 0:33 / /sys/fs/cgroup/memory rw,nosuid,nodev,noexec,relatime shared:15 - cgroup cgroup rw,memory
39 33 0:34 / /sys/fs/cgroup/unified rw,nosuid,nodev,noexec,relatime shared:16 - cgroup2 cgroup2 rw
40 33 0:35 / /sys/fs/cgroup/net_cls rw,nosuid,nodev,noexec,relatime shared:17 - cgroup cgroup rw,net_cls
";

    const PROC_CGROUP: &str = "\
12:memory:/user.slice
4:cpu,cpuacct:/user.slice
1:name=systemd:/user.slice/user-1000.slice/session-2.scope
0::/user.slice/user-1000.slice/session-2.scope
";

    fn fixture(content: &str) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        tmp
    }

    #[test]
    fn test_parse_cgroup_line() {
        let line = parse_cgroup_line("4:cpu,cpuacct:/user.slice").unwrap();
        assert_eq!(line.hierarchy_id, 4);
        assert_eq!(line.controllers, vec!["cpu", "cpuacct"]);
        assert_eq!(line.cgroup_path, "/user.slice");
    }

    #[test]
    fn test_parse_cgroup_line_unified() {
        let line = parse_cgroup_line("0::/").unwrap();
        assert_eq!(line.hierarchy_id, 0);
        assert!(line.controllers.is_empty());
    }

    #[test]
    fn test_parse_cgroup_line_path_with_colon() {
        let line = parse_cgroup_line("3:pids:/a:b").unwrap();
        assert_eq!(line.cgroup_path, "/a:b");
    }

    #[test]
    fn test_parse_cgroup_line_errors() {
        assert!(matches!(
            parse_cgroup_line("x:cpu:/"),
            Err(CgroupLineError::InvalidHierarchyId(_))
        ));
        assert!(matches!(
            parse_cgroup_line("4:cpu"),
            Err(CgroupLineError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_enumerate() {
        let mountinfo = fixture(MOUNTINFO);
        let proc_cgroup = fixture(PROC_CGROUP);

        let hierarchies = HierarchyEnumerator::new(mountinfo.path(), proc_cgroup.path())
            .enumerate()
            .unwrap();

        assert_eq!(
            hierarchies,
            vec![
                Hierarchy {
                    mountpoint: PathBuf::from("/sys/fs/cgroup/systemd"),
                    subsystems: vec!["name=systemd".into()],
                },
                Hierarchy {
                    mountpoint: PathBuf::from("/sys/fs/cgroup/cpu,cpuacct"),
                    subsystems: vec!["cpu".into(), "cpuacct".into()],
                },
                Hierarchy {
                    mountpoint: PathBuf::from("/sys/fs/cgroup/memory"),
                    subsystems: vec!["memory".into()],
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_mountpoints_are_walked_once() {
        let mounts = vec![
            CgroupMount {
                mount_point: PathBuf::from("/cg/memory"),
                super_options: vec!["rw".into(), "memory".into()],
            },
            CgroupMount {
                mount_point: PathBuf::from("/cg/memory"),
                super_options: vec!["rw".into(), "memory".into()],
            },
        ];
        let controllers = HashSet::from(["memory".to_owned()]);

        assert_eq!(select_hierarchies(mounts, &controllers).len(), 1);
    }

    #[test]
    fn test_no_v1_hierarchy_is_an_error() {
        let mountinfo = fixture(
            "39 33 0:34 / /sys/fs/cgroup rw,relatime shared:16 - cgroup2 cgroup2 rw\n",
        );
        let proc_cgroup = fixture("0::/\n");

        let err = HierarchyEnumerator::new(mountinfo.path(), proc_cgroup.path())
            .enumerate()
            .unwrap_err();

        assert!(matches!(err, HierarchyError::NoHierarchies));
    }

    #[test]
    fn test_missing_proc_cgroup_is_an_error() {
        let mountinfo = fixture(MOUNTINFO);

        let err = HierarchyEnumerator::new(mountinfo.path(), "/nonexistent/cgroup")
            .enumerate()
            .unwrap_err();

        assert!(matches!(err, HierarchyError::ProcCgroup(_)));
    }

    #[test]
    fn test_malformed_proc_cgroup_reports_line() {
        let mountinfo = fixture(MOUNTINFO);
        let proc_cgroup = fixture("12:memory:/\nbroken\n");

        let err = HierarchyEnumerator::new(mountinfo.path(), proc_cgroup.path())
            .enumerate()
            .unwrap_err();

        assert!(matches!(err, HierarchyError::CgroupLine { line: 2, .. }));
    }
}
