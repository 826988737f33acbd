use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use xxhash_rust::xxh3::Xxh3;

/// Content fingerprint of one control file read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Fingerprint over the file identity and its raw bytes.
    pub fn of_content(dir: &Path, filename: &str, content: &[u8]) -> Self {
        let mut hasher = Self::identity(b'c', dir, filename);
        hasher.update(content);
        Fingerprint(hasher.digest128())
    }

    /// Fingerprint over the file identity and the number of attached pids.
    pub fn of_pid_count(dir: &Path, filename: &str, count: usize) -> Self {
        let mut hasher = Self::identity(b'p', dir, filename);
        hasher.update(&(count as u64).to_le_bytes());
        Fingerprint(hasher.digest128())
    }

    fn identity(tag: u8, dir: &Path, filename: &str) -> Xxh3 {
        let mut hasher = Xxh3::new();
        hasher.update(&[tag]);
        hasher.update(dir.as_os_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(filename.as_bytes());
        hasher.update(&[0]);
        hasher
    }
}

/// Suppresses a report identical to the one immediately before it.
///
/// The cache holds a single fingerprint shared by every file, so only back-to-back repeats
/// are caught: `A, A` reports once, `A, B, A` reports `A` twice.
#[derive(Debug, Default)]
pub struct DedupCache {
    last: Option<Fingerprint>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `fingerprint` and returns whether the report should go ahead.
    pub fn check_and_update(&mut self, fingerprint: Fingerprint) -> bool {
        let repeated = self.last == Some(fingerprint);
        self.last = Some(fingerprint);
        !repeated
    }
}
