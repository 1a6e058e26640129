//! Directory walking implementation using walkdir.

use super::{filter::KindFilter, ClassifiedFiles, FileKind};
use crate::core::config::OrganizerConfig;
use crate::error::ScanError;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Upper bound on classification worker threads
pub const MAX_SCAN_WORKERS: usize = 4;

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Descend into subdirectories; `false` lists only the root's own files
    pub recursive: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

impl ScanConfig {
    /// Root-only scan used when re-sorting a destination
    pub fn resort() -> Self {
        Self {
            recursive: false,
            ..Self::default()
        }
    }
}

/// Shared state of a concurrent classification
struct SharedScan {
    files: ClassifiedFiles,
    directories_done: usize,
}

/// Scanner implementation using the walkdir crate
pub struct DirectoryScanner {
    config: ScanConfig,
    filter: KindFilter,
}

impl DirectoryScanner {
    pub fn new(settings: &OrganizerConfig, config: ScanConfig) -> Self {
        Self {
            config,
            filter: KindFilter::new(settings),
        }
    }

    pub fn filter(&self) -> &KindFilter {
        &self.filter
    }

    /// Classify every eligible file below `root`.
    ///
    /// `exclude` prunes a subtree (typically the destination) unless it is
    /// the root itself.
    pub fn scan(&self, root: &Path, exclude: Option<&Path>) -> Result<ClassifiedFiles, ScanError> {
        ensure_directory(root)?;

        let mut files = ClassifiedFiles::default();
        for path in self.eligible_files(root, exclude) {
            let kind = self.filter.classify(&path);
            files.push(kind, path);
        }
        files.normalize();

        debug!(
            "Scanned {}: {} images, {} videos, {} documents, {} other",
            root.display(),
            files.images.len(),
            files.videos.len(),
            files.documents.len(),
            files.others.len()
        );
        Ok(files)
    }

    /// Every file `scan` would consider, unclassified. Shared with the
    /// backup archiver so both agree on what is eligible.
    pub fn eligible_files(&self, root: &Path, exclude: Option<&Path>) -> Vec<PathBuf> {
        let exclude = exclude.filter(|ex| *ex != root);
        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        let entries = walker.into_iter().filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let path = entry.path();
            if entry.file_type().is_dir() {
                !self.filter.skips_dir(path) && exclude.map(|ex| path != ex).unwrap_or(true)
            } else {
                true
            }
        });

        for entry in entries {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if !self.filter.skips_file(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }

        files
    }

    /// Directories `scan` would descend into, root included
    fn eligible_directories(&self, root: &Path, exclude: Option<&Path>) -> Vec<PathBuf> {
        if !self.config.recursive {
            return vec![root.to_path_buf()];
        }
        let exclude = exclude.filter(|ex| *ex != root);

        WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || (entry.file_type().is_dir()
                        && !self.filter.skips_dir(entry.path())
                        && exclude.map(|ex| entry.path() != ex).unwrap_or(true))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect()
    }

    /// Same result as [`scan`](Self::scan), computed by up to
    /// [`MAX_SCAN_WORKERS`] threads.
    ///
    /// The directory list is split into one chunk per worker; each worker
    /// lists the direct files of its directories and appends them to a
    /// single mutex-guarded result. `on_progress(done, total)` is called
    /// after each directory.
    pub fn classify_concurrent<F>(
        &self,
        root: &Path,
        exclude: Option<&Path>,
        workers: usize,
        on_progress: F,
    ) -> Result<ClassifiedFiles, ScanError>
    where
        F: Fn(usize, usize) + Sync,
    {
        ensure_directory(root)?;

        let directories = self.eligible_directories(root, exclude);
        let total = directories.len();
        let workers = workers.clamp(1, MAX_SCAN_WORKERS).min(total.max(1));
        let chunk_size = total.div_ceil(workers).max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ScanError::WorkerPool(e.to_string()))?;

        let shared = Mutex::new(SharedScan {
            files: ClassifiedFiles::default(),
            directories_done: 0,
        });

        pool.install(|| {
            directories.par_chunks(chunk_size).for_each(|chunk| {
                for dir in chunk {
                    let found = self.direct_files(dir);
                    let done = {
                        let mut state = shared.lock().unwrap_or_else(|p| p.into_inner());
                        for (kind, path) in found {
                            state.files.push(kind, path);
                        }
                        state.directories_done += 1;
                        state.directories_done
                    };
                    on_progress(done, total);
                }
            });
        });

        let mut files = shared
            .into_inner()
            .unwrap_or_else(|p| p.into_inner())
            .files;
        files.normalize();
        Ok(files)
    }

    fn direct_files(&self, dir: &Path) -> Vec<(FileKind, PathBuf)> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|path| !self.filter.skips_file(path))
            .map(|path| (self.filter.classify(&path), path))
            .collect()
    }
}

fn ensure_directory(root: &Path) -> Result<(), ScanError> {
    if !root.is_dir() {
        return Err(ScanError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.jpg");
        touch(temp.path(), "trip/b.MOV");
        touch(temp.path(), "trip/day2/c.pdf");
        touch(temp.path(), "trip/day2/d.xyz");
        touch(temp.path(), ".hidden/e.jpg");
        touch(temp.path(), ".f.jpg");
        touch(temp.path(), "My Backups/g.jpg");
        touch(temp.path(), "240101-BACKUP.zip");
        temp
    }

    fn scanner(config: ScanConfig) -> DirectoryScanner {
        DirectoryScanner::new(&OrganizerConfig::default(), config)
    }

    #[test]
    fn recursive_scan_classifies_and_skips() {
        let temp = sample_tree();
        let files = scanner(ScanConfig::default()).scan(temp.path(), None).unwrap();

        assert_eq!(files.images, vec![temp.path().join("a.jpg")]);
        assert_eq!(files.videos, vec![temp.path().join("trip/b.MOV")]);
        assert_eq!(files.documents, vec![temp.path().join("trip/day2/c.pdf")]);
        assert_eq!(files.others, vec![temp.path().join("trip/day2/d.xyz")]);
    }

    #[test]
    fn resort_scan_is_root_only() {
        let temp = sample_tree();
        let files = scanner(ScanConfig::resort()).scan(temp.path(), None).unwrap();

        assert_eq!(files.total(), 1);
        assert_eq!(files.images, vec![temp.path().join("a.jpg")]);
    }

    #[test]
    fn exclusion_subtree_is_pruned() {
        let temp = sample_tree();
        let exclude = temp.path().join("trip");
        let files = scanner(ScanConfig::default())
            .scan(temp.path(), Some(&exclude))
            .unwrap();

        assert_eq!(files.total(), 1);
    }

    #[test]
    fn exclusion_equal_to_root_is_ignored() {
        let temp = sample_tree();
        let files = scanner(ScanConfig::default())
            .scan(temp.path(), Some(temp.path()))
            .unwrap();

        assert_eq!(files.total(), 4);
    }

    #[test]
    fn missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        let result = scanner(ScanConfig::default()).scan(&temp.path().join("nope"), None);
        assert!(matches!(result, Err(ScanError::DirectoryNotFound { .. })));
    }

    #[test]
    fn concurrent_matches_sequential() {
        let temp = sample_tree();
        for i in 0..20 {
            touch(temp.path(), &format!("bulk/{}/IMG_{}.jpg", i % 7, i));
        }
        let scanner = scanner(ScanConfig::default());
        let calls = AtomicUsize::new(0);

        let sequential = scanner.scan(temp.path(), None).unwrap();
        let concurrent = scanner
            .classify_concurrent(temp.path(), None, 8, |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(concurrent, sequential);
        assert!(calls.load(Ordering::SeqCst) > 0);
    }
}
