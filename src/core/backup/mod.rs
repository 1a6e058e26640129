//! # Backup Module
//!
//! Optional zip snapshot of the source tree, written before anything moves.
//!
//! The archive is `<dest>/<yymmdd>-BACKUP.zip` (with a `_n` suffix if that
//! name is taken). Entries are stored relative to the source root. The same
//! skip rules as the scanner apply, so earlier archives and backup folders
//! are never archived again.

use crate::core::config::OrganizerConfig;
use crate::core::fileops::unique_path;
use crate::core::scanner::{DirectoryScanner, ScanConfig};
use crate::error::BackupError;
use chrono::Local;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Result of a backup attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Archive written to this path
    Created(PathBuf),
    /// No eligible files; no archive written
    NothingToBackup,
    /// Cancelled; the partial archive was deleted
    Terminated,
}

/// Writes backup archives
pub struct BackupArchiver {
    scanner: DirectoryScanner,
}

impl BackupArchiver {
    pub fn new(config: &OrganizerConfig) -> Self {
        Self {
            scanner: DirectoryScanner::new(config, ScanConfig::default()),
        }
    }

    /// Archive name for today's date
    pub fn archive_name() -> String {
        format!("{}-BACKUP.zip", Local::now().format("%y%m%d"))
    }

    /// Archive every eligible file under `source` into `dest`.
    ///
    /// `on_progress(done, total)` fires every `max(1, total / 50)` files and
    /// once at the end. `should_cancel` is polled before each file.
    pub fn backup<P, C>(
        &self,
        source: &Path,
        dest: &Path,
        mut on_progress: P,
        mut should_cancel: C,
    ) -> Result<BackupOutcome, BackupError>
    where
        P: FnMut(usize, usize),
        C: FnMut() -> bool,
    {
        let files = self.scanner.eligible_files(source, Some(dest));
        if files.is_empty() {
            info!("Nothing to back up in {}", source.display());
            return Ok(BackupOutcome::NothingToBackup);
        }

        fs::create_dir_all(dest).map_err(|e| BackupError::CreateArchive {
            path: dest.to_path_buf(),
            source: e,
        })?;
        let archive_path = unique_path(&dest.join(Self::archive_name()));

        match write_archive(&archive_path, source, &files, &mut on_progress, &mut should_cancel) {
            Ok(true) => {
                info!("Backed up {} files to {}", files.len(), archive_path.display());
                Ok(BackupOutcome::Created(archive_path))
            }
            Ok(false) => {
                remove_partial(&archive_path);
                Ok(BackupOutcome::Terminated)
            }
            Err(e) => {
                remove_partial(&archive_path);
                Err(e)
            }
        }
    }
}

/// Returns `Ok(false)` when cancelled
fn write_archive<P, C>(
    archive_path: &Path,
    source: &Path,
    files: &[PathBuf],
    on_progress: &mut P,
    should_cancel: &mut C,
) -> Result<bool, BackupError>
where
    P: FnMut(usize, usize),
    C: FnMut() -> bool,
{
    let file = File::create(archive_path).map_err(|e| BackupError::CreateArchive {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    let total = files.len();
    let step = (total / 50).max(1);
    let zip_error = |e| BackupError::Archive {
        path: archive_path.to_path_buf(),
        source: e,
    };

    for (index, path) in files.iter().enumerate() {
        if should_cancel() {
            return Ok(false);
        }

        let name = entry_name(source, path);
        zip.start_file(name, options).map_err(zip_error)?;

        let add_error = |e| BackupError::AddFile {
            path: path.clone(),
            source: e,
        };
        let mut reader = BufReader::new(File::open(path).map_err(add_error)?);
        io::copy(&mut reader, &mut zip).map_err(add_error)?;

        let done = index + 1;
        if done % step == 0 || done == total {
            on_progress(done, total);
        }
    }

    zip.finish().map_err(zip_error)?;
    Ok(true)
}

/// Archive entry name: path relative to the source, `/`-separated
fn entry_name(source: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(source).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn remove_partial(archive_path: &Path) {
    if let Err(e) = fs::remove_file(archive_path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove partial archive {}: {}", archive_path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn archiver() -> BackupArchiver {
        BackupArchiver::new(&OrganizerConfig::default())
    }

    fn write(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn archives_eligible_files_with_relative_names() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(source.path(), "a.jpg", b"aaa");
        write(source.path(), "trip/b.mov", b"bbb");
        write(source.path(), ".secret.jpg", b"hidden");
        write(source.path(), "BACKUP/old.jpg", b"old");

        let mut reports = Vec::new();
        let outcome = archiver()
            .backup(source.path(), dest.path(), |d, t| reports.push((d, t)), || false)
            .unwrap();

        let BackupOutcome::Created(path) = outcome else {
            panic!("expected an archive");
        };
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("-BACKUP.zip"));
        assert_eq!(reports.last(), Some(&(2, 2)));

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut contents = String::new();
        archive
            .by_name("trip/b.mov")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "bbb");
    }

    #[test]
    fn empty_source_writes_nothing() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let outcome = archiver()
            .backup(source.path(), dest.path(), |_, _| {}, || false)
            .unwrap();

        assert_eq!(outcome, BackupOutcome::NothingToBackup);
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[test]
    fn cancellation_removes_partial_archive() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        for i in 0..5 {
            write(source.path(), &format!("{}.jpg", i), b"data");
        }

        let mut polls = 0;
        let outcome = archiver()
            .backup(
                source.path(),
                dest.path(),
                |_, _| {},
                || {
                    polls += 1;
                    polls > 2
                },
            )
            .unwrap();

        assert_eq!(outcome, BackupOutcome::Terminated);
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[test]
    fn existing_archive_is_not_overwritten() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(source.path(), "a.jpg", b"aaa");
        fs::write(dest.path().join(BackupArchiver::archive_name()), b"previous").unwrap();

        let outcome = archiver()
            .backup(source.path(), dest.path(), |_, _| {}, || false)
            .unwrap();

        let BackupOutcome::Created(path) = outcome else {
            panic!("expected an archive");
        };
        assert!(path.to_string_lossy().ends_with("-BACKUP_1.zip"));
        assert_eq!(
            fs::read(dest.path().join(BackupArchiver::archive_name())).unwrap(),
            b"previous"
        );
    }

    #[test]
    fn archive_inside_source_is_skipped() {
        let source = TempDir::new().unwrap();
        write(source.path(), "a.jpg", b"aaa");

        let outcome = archiver()
            .backup(source.path(), source.path(), |_, _| {}, || false)
            .unwrap();

        let BackupOutcome::Created(path) = outcome else {
            panic!("expected an archive");
        };
        let archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
    }
}
