//! # Dedup Module
//!
//! Decides whether two files are byte-identical: sizes first, then content
//! digests. Digests are cached per path for the lifetime of a run.

use crate::core::hasher::{content_digest, ContentDigest};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Byte-identity checker with a per-run digest cache
pub struct Deduplicator {
    digests: RwLock<HashMap<PathBuf, ContentDigest>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self {
            digests: RwLock::new(HashMap::new()),
        }
    }

    /// True when both files exist, have equal size and equal digests.
    ///
    /// Any I/O error yields `false`.
    pub fn identical(&self, a: &Path, b: &Path) -> bool {
        let (size_a, size_b) = match (a.metadata(), b.metadata()) {
            (Ok(ma), Ok(mb)) => (ma.len(), mb.len()),
            _ => return false,
        };
        if size_a != size_b {
            return false;
        }

        match (self.digest(a), self.digest(b)) {
            (Some(da), Some(db)) => da == db,
            _ => false,
        }
    }

    /// Cached digest of `path`, or `None` when it cannot be read
    pub fn digest(&self, path: &Path) -> Option<ContentDigest> {
        if let Ok(digests) = self.digests.read() {
            if let Some(digest) = digests.get(path) {
                return Some(*digest);
            }
        }

        match content_digest(path) {
            Ok(digest) => {
                if let Ok(mut digests) = self.digests.write() {
                    digests.insert(path.to_path_buf(), digest);
                }
                Some(digest)
            }
            Err(e) => {
                debug!("Cannot hash {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Drop the cached digest for a path whose content may change
    pub fn forget(&self, path: &Path) {
        if let Ok(mut digests) = self.digests.write() {
            digests.remove(path);
        }
    }

    /// Clear all cached digests; called at the start of each run
    pub fn reset(&self) {
        if let Ok(mut digests) = self.digests.write() {
            digests.clear();
        }
    }

    pub fn cached_len(&self) -> usize {
        self.digests.read().map(|d| d.len()).unwrap_or(0)
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn identical_files_are_identical() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        assert!(Deduplicator::new().identical(&a, &b));
    }

    #[test]
    fn different_sizes_short_circuit() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        fs::write(&a, b"short").unwrap();
        fs::write(&b, b"much longer").unwrap();

        let dedup = Deduplicator::new();
        assert!(!dedup.identical(&a, &b));
        assert_eq!(dedup.cached_len(), 0);
    }

    #[test]
    fn same_size_different_content() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        fs::write(&a, b"abcd").unwrap();
        fs::write(&b, b"abce").unwrap();

        assert!(!Deduplicator::new().identical(&a, &b));
    }

    #[test]
    fn missing_file_is_not_identical() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        fs::write(&a, b"abcd").unwrap();

        assert!(!Deduplicator::new().identical(&a, &temp.path().join("gone.jpg")));
    }

    #[test]
    fn reset_clears_cache() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        fs::write(&a, b"same").unwrap();
        fs::write(&b, b"same").unwrap();

        let dedup = Deduplicator::new();
        assert!(dedup.identical(&a, &b));
        assert_eq!(dedup.cached_len(), 2);

        dedup.reset();
        assert_eq!(dedup.cached_len(), 0);
    }
}
