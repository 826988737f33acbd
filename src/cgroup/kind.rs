//! Maps control-file names to the grammar used to read them.
//!
//! Resolution first looks the name up in the exact table. Names that are not listed there
//! are canonicalized through [`FALLBACK_RULES`], evaluated top to bottom, so that per-item
//! files like `hugetlb.2MB.limit_in_bytes` share the parser of `hugetlb.limit_in_bytes`.

/// Grammar of a recognized control file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Unsigned integer, negative values saturate to zero.
    Uint,
    /// Signed integer.
    Int,
    /// Single trimmed string.
    String,
    /// `key value` per line.
    StringPairs,
    /// `major:minor value` per line.
    DeviceIo,
    /// Device access rules, always read from `devices.list`.
    DeviceAccess,
    /// Pids attached to the cgroup.
    Procs,
}

/// Maps `prefix<item>suffix` to `canonical`, where `<item>` is non-empty and has no `.`.
#[derive(Debug)]
struct FallbackRule {
    prefix: &'static str,
    suffix: &'static str,
    canonical: &'static str,
}

impl FallbackRule {
    fn matches(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix)
            .and_then(|rest| rest.strip_suffix(self.suffix))
            .is_some_and(|item| !item.is_empty() && !item.contains('.'))
    }
}

const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        prefix: "hugetlb.",
        suffix: ".limit_in_bytes",
        canonical: "hugetlb.limit_in_bytes",
    },
    FallbackRule {
        prefix: "hugetlb.",
        suffix: ".usage_in_bytes",
        canonical: "hugetlb.usage_in_bytes",
    },
];

impl FileKind {
    /// Resolves the kind of a control file from its name.
    ///
    /// Returns `None` for files that are not reported.
    pub fn for_name(name: &str) -> Option<FileKind> {
        Self::exact(name).or_else(|| canonical_name(name).and_then(Self::exact))
    }

    fn exact(name: &str) -> Option<FileKind> {
        use FileKind::*;

        let kind = match name {
            "cgroup.procs" => Procs,
            "cgroup.clone_children" | "notify_on_release" => Uint,

            "blkio.weight" | "blkio.leaf_weight" => Uint,
            "blkio.weight_device"
            | "blkio.leaf_weight_device"
            | "blkio.throttle.read_bps_device"
            | "blkio.throttle.write_bps_device"
            | "blkio.throttle.read_iops_device"
            | "blkio.throttle.write_iops_device" => DeviceIo,

            "cpu.shares" | "cpu.cfs_period_us" | "cpu.rt_period_us" => Uint,
            "cpu.cfs_quota_us" | "cpu.rt_runtime_us" => Int,
            "cpu.stat" => StringPairs,

            "cpuacct.usage" => Uint,
            "cpuacct.stat" => StringPairs,
            "cpuacct.usage_percpu" => String,

            "cpuset.cpus" | "cpuset.mems" => String,
            "cpuset.cpu_exclusive" | "cpuset.mem_exclusive" => Uint,

            "freezer.state" => String,

            "hugetlb.limit_in_bytes" | "hugetlb.usage_in_bytes" => Uint,

            "memory.limit_in_bytes"
            | "memory.memsw.limit_in_bytes"
            | "memory.soft_limit_in_bytes"
            | "memory.kmem.limit_in_bytes"
            | "memory.kmem.tcp.limit_in_bytes" => Int,
            "memory.use_hierarchy"
            | "memory.swappiness"
            | "memory.move_charge_at_immigrate"
            | "memory.usage_in_bytes"
            | "memory.max_usage_in_bytes"
            | "memory.failcnt" => Uint,
            "memory.oom_control" | "memory.stat" => StringPairs,

            "net_cls.classid" => Uint,
            "net_prio.prioidx" => Uint,
            "net_prio.ifpriomap" => StringPairs,

            "pids.max" => String,
            "pids.current" => Uint,

            "devices.allow" | "devices.deny" | "devices.list" => DeviceAccess,

            _ => return None,
        };
        Some(kind)
    }
}

/// Returns the canonical name of a per-item control file, first matching rule wins.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    FALLBACK_RULES
        .iter()
        .find(|rule| rule.matches(name))
        .map(|rule| rule.canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_names() {
        assert_eq!(FileKind::for_name("cgroup.procs"), Some(FileKind::Procs));
        assert_eq!(FileKind::for_name("cpu.shares"), Some(FileKind::Uint));
        assert_eq!(FileKind::for_name("cpu.cfs_quota_us"), Some(FileKind::Int));
        assert_eq!(FileKind::for_name("cpuset.cpus"), Some(FileKind::String));
        assert_eq!(
            FileKind::for_name("memory.oom_control"),
            Some(FileKind::StringPairs)
        );
        assert_eq!(
            FileKind::for_name("blkio.throttle.read_bps_device"),
            Some(FileKind::DeviceIo)
        );
        assert_eq!(
            FileKind::for_name("devices.deny"),
            Some(FileKind::DeviceAccess)
        );
    }

    #[test]
    fn test_hugetlb_page_size_files_fall_back() {
        assert_eq!(
            canonical_name("hugetlb.2MB.limit_in_bytes"),
            Some("hugetlb.limit_in_bytes")
        );
        assert_eq!(
            FileKind::for_name("hugetlb.1GB.limit_in_bytes"),
            Some(FileKind::Uint)
        );
        assert_eq!(
            canonical_name("hugetlb.2MB.usage_in_bytes"),
            Some("hugetlb.usage_in_bytes")
        );
    }

    #[test]
    fn test_fallback_requires_single_item_segment() {
        assert_eq!(canonical_name("hugetlb..limit_in_bytes"), None);
        assert_eq!(canonical_name("hugetlb.2MB.rsvd.limit_in_bytes"), None);
        assert_eq!(canonical_name("hugetlb.limit_in_bytes"), None);
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        assert_eq!(FileKind::for_name("tasks"), None);
        assert_eq!(FileKind::for_name("memory.pressure_level"), None);
        assert_eq!(FileKind::for_name("cgroup.event_control"), None);
    }
}
