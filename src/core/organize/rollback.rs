//! Undo log of a run.
//!
//! Every filesystem change the engine makes is pushed here in order.
//! Replaying walks the log backwards, so later changes are undone first.

use super::types::rebase_path;
use crate::core::fileops::safe_move;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One reversible change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackEntry {
    /// `from` was moved (or renamed) to `to`
    Moved { from: PathBuf, to: PathBuf },
    /// `original` was deleted as an identical copy of `kept`
    DuplicateRemoved { original: PathBuf, kept: PathBuf },
}

/// Result of replaying the log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayResult {
    pub restored: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct RollbackLog {
    entries: Vec<RollbackEntry>,
}

impl RollbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RollbackEntry) {
        self.entries.push(entry);
    }

    pub fn record_move(&mut self, from: &Path, to: &Path) {
        self.push(RollbackEntry::Moved {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[RollbackEntry] {
        &self.entries
    }

    /// Apply a directory rename to every destination recorded so far
    pub fn rebase(&mut self, old: &Path, new: &Path) {
        for entry in &mut self.entries {
            match entry {
                RollbackEntry::Moved { to, .. } => *to = rebase_path(to, old, new),
                RollbackEntry::DuplicateRemoved { kept, .. } => {
                    *kept = rebase_path(kept, old, new)
                }
            }
        }
    }

    /// Undo every entry, newest first, and empty the log
    pub fn replay(&mut self) -> ReplayResult {
        let mut result = ReplayResult::default();

        while let Some(entry) = self.entries.pop() {
            let undone = match &entry {
                RollbackEntry::Moved { from, to } => undo_move(from, to),
                RollbackEntry::DuplicateRemoved { original, kept } => restore_copy(original, kept),
            };
            if undone {
                result.restored += 1;
            } else {
                result.failed += 1;
            }
        }

        result
    }
}

fn undo_move(from: &Path, to: &Path) -> bool {
    if from.exists() {
        warn!(
            "Cannot restore {}: original location is occupied",
            from.display()
        );
        return false;
    }
    match safe_move(to, from, None) {
        Ok(()) => {
            debug!("Restored {} -> {}", to.display(), from.display());
            true
        }
        Err(e) => {
            warn!("Failed to restore {}: {}", from.display(), e);
            false
        }
    }
}

fn restore_copy(original: &Path, kept: &Path) -> bool {
    if original.exists() {
        return true;
    }
    if let Some(parent) = original.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to recreate {}: {}", parent.display(), e);
            return false;
        }
    }
    match fs::copy(kept, original) {
        Ok(_) => true,
        Err(e) => {
            warn!(
                "Failed to restore duplicate {} from {}: {}",
                original.display(),
                kept.display(),
                e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replay_undoes_moves_in_reverse() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("out/b.jpg");
        let c = temp.path().join("out/renamed/b.jpg");
        fs::write(&a, b"a").unwrap();

        let mut log = RollbackLog::new();
        safe_move(&a, &b, None).unwrap();
        log.record_move(&a, &b);
        safe_move(&b, &c, None).unwrap();
        log.record_move(&b, &c);

        let result = log.replay();
        assert_eq!(result, ReplayResult { restored: 2, failed: 0 });
        assert_eq!(fs::read(&a).unwrap(), b"a");
        assert!(!c.exists());
        assert!(log.is_empty());
    }

    #[test]
    fn occupied_original_counts_as_failure() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        fs::write(&a, b"new").unwrap();
        fs::write(&b, b"moved").unwrap();

        let mut log = RollbackLog::new();
        log.record_move(&a, &b);

        assert_eq!(log.replay(), ReplayResult { restored: 0, failed: 1 });
        assert_eq!(fs::read(&a).unwrap(), b"new");
        assert!(b.exists());
    }

    #[test]
    fn removed_duplicate_is_recreated() {
        let temp = TempDir::new().unwrap();
        let kept = temp.path().join("out/kept.jpg");
        let original = temp.path().join("in/dup.jpg");
        fs::create_dir_all(kept.parent().unwrap()).unwrap();
        fs::write(&kept, b"same").unwrap();

        let mut log = RollbackLog::new();
        log.push(RollbackEntry::DuplicateRemoved {
            original: original.clone(),
            kept: kept.clone(),
        });

        assert_eq!(log.replay().restored, 1);
        assert_eq!(fs::read(&original).unwrap(), b"same");
        assert!(kept.exists());
    }

    #[test]
    fn rebase_rewrites_destinations() {
        let mut log = RollbackLog::new();
        log.record_move(Path::new("/in/a.jpg"), Path::new("/out/2024[2-2]/a.jpg"));
        log.rebase(Path::new("/out/2024[2-2]"), Path::new("/out/2024"));

        assert_eq!(
            log.entries()[0],
            RollbackEntry::Moved {
                from: PathBuf::from("/in/a.jpg"),
                to: PathBuf::from("/out/2024/a.jpg"),
            }
        );
    }
}
