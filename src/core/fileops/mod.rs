//! # FileOps Module
//!
//! Filesystem primitives used by every phase: stat-based time readers, the
//! safe move, collision-free target names and empty-directory pruning.

use crate::error::MoveError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Returned when no usable timestamp exists at all (1900-01-01 00:00:00)
pub fn sentinel_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert a filesystem timestamp to local wall-clock time
pub fn to_local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

/// Modification time in local time
pub fn modified_time(path: &Path) -> Option<NaiveDateTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok().map(to_local)
}

/// Creation (birth) time; `None` on platforms that do not record it
pub fn created_time(path: &Path) -> Option<NaiveDateTime> {
    fs::metadata(path).and_then(|m| m.created()).ok().map(to_local)
}

/// Last access time
pub fn accessed_time(path: &Path) -> Option<NaiveDateTime> {
    fs::metadata(path).and_then(|m| m.accessed()).ok().map(to_local)
}

/// Return `path` if free, otherwise the first free `<stem>_<n><.ext>`, n >= 1.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move `from` to `to`, creating the target's parent directories.
///
/// Tries a rename first; across filesystems falls back to copy, size check
/// and delete. After the move, now-empty parents of `from` are removed up to
/// (not including) `stop_at`.
pub fn safe_move(from: &Path, to: &Path, stop_at: Option<&Path>) -> Result<(), MoveError> {
    if !from.exists() {
        return Err(MoveError::SourceMissing {
            path: from.to_path_buf(),
        });
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| MoveError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if let Err(rename_err) = fs::rename(from, to) {
        debug!(
            "Rename {} -> {} failed ({}), copying instead",
            from.display(),
            to.display(),
            rename_err
        );
        copy_verify_delete(from, to)?;
    }

    if let Some(parent) = from.parent() {
        remove_empty_parents(parent, stop_at);
    }

    Ok(())
}

fn copy_verify_delete(from: &Path, to: &Path) -> Result<(), MoveError> {
    let transfer = |source| MoveError::Transfer {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let expected = fs::metadata(from).map_err(transfer)?.len();
    fs::copy(from, to).map_err(transfer)?;

    let actual = fs::metadata(to).map_err(transfer)?.len();
    if actual != expected {
        let _ = fs::remove_file(to);
        return Err(MoveError::Verification {
            to: to.to_path_buf(),
            expected,
            actual,
        });
    }

    fs::remove_file(from).map_err(|source| MoveError::Remove {
        path: from.to_path_buf(),
        source,
    })
}

/// Remove `dir` and its ancestors while they are empty, stopping at `stop_at`.
///
/// Without a stop directory only `dir` itself is considered.
pub fn remove_empty_parents(dir: &Path, stop_at: Option<&Path>) {
    let mut current = Some(dir);
    while let Some(path) = current {
        if let Some(stop) = stop_at {
            if path == stop || !path.starts_with(stop) {
                break;
            }
        } else if path != dir {
            break;
        }
        if !is_empty_dir(path) {
            break;
        }
        if let Err(e) = fs::remove_dir(path) {
            debug!("Could not remove empty directory {}: {}", path.display(), e);
            break;
        }
        current = path.parent();
    }
}

/// Remove every empty directory below `root`, deepest first. `root` stays.
pub fn remove_empty_dirs(root: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if is_empty_dir(path) {
            match fs::remove_dir(path) {
                Ok(()) => removed.push(path.to_path_buf()),
                Err(e) => warn!("Failed to remove empty directory {}: {}", path.display(), e),
            }
        }
    }

    removed
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use tempfile::TempDir;

    #[test]
    fn unique_path_returns_free_path_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.jpg");
        assert_eq!(unique_path(&path), path);
    }

    #[test]
    fn unique_path_picks_smallest_free_suffix() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jpg"), b"1").unwrap();
        fs::write(temp.path().join("a_1.jpg"), b"2").unwrap();

        assert_eq!(
            unique_path(&temp.path().join("a.jpg")),
            temp.path().join("a_2.jpg")
        );
    }

    #[test]
    fn unique_path_handles_missing_extension() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("README"), b"1").unwrap();
        assert_eq!(
            unique_path(&temp.path().join("README")),
            temp.path().join("README_1")
        );
    }

    #[test]
    fn safe_move_creates_parents_and_prunes_source_dirs() {
        let temp = TempDir::new().unwrap();
        let source_root = temp.path().join("in");
        let nested = source_root.join("trip").join("day1");
        fs::create_dir_all(&nested).unwrap();
        let from = nested.join("photo.jpg");
        fs::write(&from, b"pixels").unwrap();

        let to = temp.path().join("out").join("2024").join("photo.jpg");
        safe_move(&from, &to, Some(source_root.as_path())).unwrap();

        assert!(to.exists());
        assert!(!from.exists());
        assert!(!source_root.join("trip").exists());
        assert!(source_root.exists());
    }

    #[test]
    fn safe_move_missing_source_is_error() {
        let temp = TempDir::new().unwrap();
        let result = safe_move(
            &temp.path().join("nope.jpg"),
            &temp.path().join("out.jpg"),
            None,
        );
        assert!(matches!(result, Err(MoveError::SourceMissing { .. })));
    }

    #[test]
    fn remove_empty_dirs_is_bottom_up_and_keeps_root() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/b/c")).unwrap();
        fs::create_dir_all(temp.path().join("keep")).unwrap();
        fs::write(temp.path().join("keep/file.txt"), b"x").unwrap();

        let removed = remove_empty_dirs(temp.path());

        assert_eq!(removed.len(), 3);
        assert!(!temp.path().join("a").exists());
        assert!(temp.path().join("keep/file.txt").exists());
        assert!(temp.path().exists());
    }

    #[test]
    fn time_readers_return_recent_local_time() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("t.txt");
        fs::write(&path, b"x").unwrap();

        let modified = modified_time(&path).unwrap();
        assert!(modified.year() > 1970);
        assert!(accessed_time(&path).is_some());
        assert!(modified_time(&temp.path().join("missing")).is_none());
    }

    #[test]
    fn sentinel_is_1900() {
        assert_eq!(sentinel_date().to_string(), "1900-01-01 00:00:00");
    }
}
