//! Types for organization runs.

use crate::core::config::OrganizationMode;
use crate::core::scanner::FileKind;
use crate::events::RunSummary;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A scanned file with its resolved date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: FileKind,
    pub date: NaiveDateTime,
}

impl MediaFile {
    /// Dates at or before 1970 count as "no date"
    pub fn has_date(&self) -> bool {
        self.date.year() > crate::core::dates::MIN_PLAUSIBLE_YEAR
    }
}

/// Grouping key: the date at the configured granularity, or no date.
///
/// Dated keys sort chronologically (they share one granularity within a
/// run, so string order is date order) and `NoDate` sorts last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DateKey {
    Dated(String),
    NoDate,
}

impl DateKey {
    pub fn for_file(file: &MediaFile, mode: OrganizationMode) -> DateKey {
        if !file.has_date() {
            return DateKey::NoDate;
        }
        let format = match mode {
            OrganizationMode::Yearly => "%Y",
            OrganizationMode::Monthly => "%Y-%m",
            OrganizationMode::Daily => "%Y-%m-%d",
        };
        DateKey::Dated(file.date.format(format).to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            DateKey::Dated(key) => key,
            DateKey::NoDate => "no-date",
        }
    }

    /// Year, month and day parts present in the key
    pub fn parts(&self) -> Vec<&str> {
        match self {
            DateKey::Dated(key) => key.split('-').collect(),
            DateKey::NoDate => Vec::new(),
        }
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The files of one date key, split by kind
#[derive(Debug, Clone, Default)]
pub struct DateBucket {
    pub images: Vec<MediaFile>,
    pub videos: Vec<MediaFile>,
    pub documents: Vec<MediaFile>,
    pub others: Vec<MediaFile>,
}

impl DateBucket {
    pub fn push(&mut self, file: MediaFile) {
        match file.kind {
            FileKind::Image => self.images.push(file),
            FileKind::Video => self.videos.push(file),
            FileKind::Document => self.documents.push(file),
            FileKind::Other => self.others.push(file),
        }
    }

    pub fn list(&self, kind: FileKind) -> &[MediaFile] {
        match kind {
            FileKind::Image => &self.images,
            FileKind::Video => &self.videos,
            FileKind::Document => &self.documents,
            FileKind::Other => &self.others,
        }
    }

    /// Files that count against folder capacity
    pub fn media_len(&self) -> usize {
        self.images.len() + self.videos.len() + self.documents.len()
    }

    /// Sort each list by date, then path
    pub fn sort(&mut self) {
        for list in [
            &mut self.images,
            &mut self.videos,
            &mut self.documents,
            &mut self.others,
        ] {
            list.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
        }
    }
}

/// All buckets of a run, ordered by key
#[derive(Debug, Clone, Default)]
pub struct DateBuckets {
    buckets: BTreeMap<DateKey, DateBucket>,
}

impl DateBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: DateKey, file: MediaFile) {
        self.buckets.entry(key).or_default().push(file);
    }

    pub fn sort(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.sort();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateKey, &DateBucket)> {
        self.buckets.iter()
    }

    pub fn get(&self, key: &DateKey) -> Option<&DateBucket> {
        self.buckets.get(key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub images: usize,
    pub videos: usize,
    pub documents: usize,
    pub others: usize,
    pub identical_files_removed: usize,
    pub skipped_others: usize,
    pub failed_moves: usize,
    /// Files placed per target folder
    pub folder_counts: BTreeMap<PathBuf, usize>,
}

impl RunStats {
    pub fn record(&mut self, kind: FileKind) {
        match kind {
            FileKind::Image => self.images += 1,
            FileKind::Video => self.videos += 1,
            FileKind::Document => self.documents += 1,
            FileKind::Other => self.others += 1,
        }
    }

    pub fn processed(&self, kind: FileKind) -> usize {
        match kind {
            FileKind::Image => self.images,
            FileKind::Video => self.videos,
            FileKind::Document => self.documents,
            FileKind::Other => self.others,
        }
    }

    pub fn total_processed(&self) -> usize {
        self.images + self.videos + self.documents + self.others
    }

    pub fn record_placement(&mut self, folder: &Path) {
        *self.folder_counts.entry(folder.to_path_buf()).or_insert(0) += 1;
    }

    /// Apply a folder rename to the per-folder counts
    pub fn rebase(&mut self, old: &Path, new: &Path) {
        let counts = std::mem::take(&mut self.folder_counts);
        for (folder, count) in counts {
            let folder = rebase_path(&folder, old, new);
            *self.folder_counts.entry(folder).or_insert(0) += count;
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            images: self.images,
            videos: self.videos,
            documents: self.documents,
            others: self.others,
            identical_files_removed: self.identical_files_removed,
            failed_moves: self.failed_moves,
            folders_used: self.folder_counts.len(),
        }
    }
}

/// Replace the `old` prefix of `path` with `new`; other paths are unchanged
pub fn rebase_path(path: &Path, old: &Path, new: &Path) -> PathBuf {
    match path.strip_prefix(old) {
        Ok(rest) if rest.as_os_str().is_empty() => new.to_path_buf(),
        Ok(rest) => new.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub structure: OrganizationMode,
    pub stats: RunStats,
    /// Backup archive written for this run, if any
    pub archive: Option<PathBuf>,
    /// Files handled by the resort pass
    pub resorted: usize,
    /// Folder summary lines, ordered by folder date
    pub folder_summary: Vec<String>,
    pub duration_ms: u64,
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Stopped by a terminate request; moves so far are still in place
    /// until rolled back
    Terminated,
}

impl RunOutcome {
    pub fn is_terminated(&self) -> bool {
        matches!(self, RunOutcome::Terminated)
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::Terminated => None,
        }
    }
}

/// What `rollback` undid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    pub restored: usize,
    pub failed: usize,
    pub removed_dirs: usize,
}

/// Parameters of a full run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub backup: bool,
    /// Run the resort pass over the destination afterwards
    pub resort: bool,
}

impl RunRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            backup: false,
            resort: true,
        }
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_resort(mut self, resort: bool) -> Self {
        self.resort = resort;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn file(y: i32, m: u32, d: u32) -> MediaFile {
        MediaFile {
            path: PathBuf::from(format!("/in/{}-{}-{}.jpg", y, m, d)),
            kind: FileKind::Image,
            date: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn date_key_follows_granularity() {
        let f = file(2024, 3, 15);
        assert_eq!(DateKey::for_file(&f, OrganizationMode::Yearly).as_str(), "2024");
        assert_eq!(DateKey::for_file(&f, OrganizationMode::Monthly).as_str(), "2024-03");
        assert_eq!(DateKey::for_file(&f, OrganizationMode::Daily).as_str(), "2024-03-15");
    }

    #[test]
    fn old_dates_map_to_no_date() {
        assert_eq!(
            DateKey::for_file(&file(1970, 6, 1), OrganizationMode::Yearly),
            DateKey::NoDate
        );
        assert_eq!(
            DateKey::for_file(&file(1900, 1, 1), OrganizationMode::Daily),
            DateKey::NoDate
        );
    }

    #[test]
    fn no_date_sorts_last() {
        let mut keys = vec![
            DateKey::NoDate,
            DateKey::Dated("2024".into()),
            DateKey::Dated("1999".into()),
        ];
        keys.sort();
        assert_eq!(keys.last(), Some(&DateKey::NoDate));
        assert_eq!(keys[0].as_str(), "1999");
    }

    #[test]
    fn bucket_sorts_by_date_then_path() {
        let mut bucket = DateBucket::default();
        bucket.push(file(2024, 5, 1));
        bucket.push(file(2024, 1, 1));
        bucket.sort();
        assert_eq!(bucket.images[0].date.month(), 1);
        assert_eq!(bucket.media_len(), 2);
    }

    #[test]
    fn rebase_moves_counts_to_new_folder() {
        let mut stats = RunStats::default();
        stats.record_placement(Path::new("/out/2024[2-3]"));
        stats.record_placement(Path::new("/out/2023"));
        stats.rebase(Path::new("/out/2024[2-3]"), Path::new("/out/2024[1-2]"));

        assert_eq!(stats.folder_counts.get(Path::new("/out/2024[1-2]")), Some(&1));
        assert!(!stats.folder_counts.contains_key(Path::new("/out/2024[2-3]")));
        assert_eq!(stats.folder_counts.len(), 2);
    }

    #[test]
    fn rebase_path_only_touches_prefix() {
        assert_eq!(
            rebase_path(Path::new("/out/2024[2-2]/a.jpg"), Path::new("/out/2024[2-2]"), Path::new("/out/2024")),
            PathBuf::from("/out/2024/a.jpg")
        );
        assert_eq!(
            rebase_path(Path::new("/out/2023/a.jpg"), Path::new("/out/2024"), Path::new("/out/x")),
            PathBuf::from("/out/2023/a.jpg")
        );
    }
}
