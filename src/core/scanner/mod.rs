//! # Scanner Module
//!
//! Walks a directory tree and sorts every eligible file into one of four
//! kinds: image, video, document or other.
//!
//! ## Always skipped
//! - Hidden files and directories (name starts with `.`)
//! - `.zip` files (backup archives live next to the sorted output)
//! - Directories whose name contains "backup" (any case) or the configured
//!   backup folder name
//!
//! ## Example
//! ```rust,ignore
//! use media_organizer::core::scanner::{DirectoryScanner, ScanConfig};
//!
//! let scanner = DirectoryScanner::new(&config, ScanConfig::default());
//! let files = scanner.scan(Path::new("/Users/me/Pictures"), None)?;
//! println!("{} images", files.images.len());
//! ```

mod filter;
mod walker;

pub use filter::KindFilter;
pub use walker::{DirectoryScanner, ScanConfig, MAX_SCAN_WORKERS};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of file, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileKind {
    Image,
    Video,
    Document,
    Other,
}

impl FileKind {
    pub const ALL: [FileKind; 4] = [
        FileKind::Image,
        FileKind::Video,
        FileKind::Document,
        FileKind::Other,
    ];

    /// Kinds that count against folder capacity
    pub fn is_media(&self) -> bool {
        !matches!(self, FileKind::Other)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::Image => "image",
            FileKind::Video => "video",
            FileKind::Document => "document",
            FileKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Scan output: one sorted path list per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedFiles {
    pub images: Vec<PathBuf>,
    pub videos: Vec<PathBuf>,
    pub documents: Vec<PathBuf>,
    pub others: Vec<PathBuf>,
}

impl ClassifiedFiles {
    pub fn push(&mut self, kind: FileKind, path: PathBuf) {
        self.list_mut(kind).push(path);
    }

    pub fn list(&self, kind: FileKind) -> &[PathBuf] {
        match kind {
            FileKind::Image => &self.images,
            FileKind::Video => &self.videos,
            FileKind::Document => &self.documents,
            FileKind::Other => &self.others,
        }
    }

    fn list_mut(&mut self, kind: FileKind) -> &mut Vec<PathBuf> {
        match kind {
            FileKind::Image => &mut self.images,
            FileKind::Video => &mut self.videos,
            FileKind::Document => &mut self.documents,
            FileKind::Other => &mut self.others,
        }
    }

    pub fn total(&self) -> usize {
        self.images.len() + self.videos.len() + self.documents.len() + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Sort every list and drop duplicates
    pub fn normalize(&mut self) {
        for kind in FileKind::ALL {
            let list = self.list_mut(kind);
            list.sort();
            list.dedup();
        }
    }

    /// All files with their kind, in kind order
    pub fn iter(&self) -> impl Iterator<Item = (FileKind, &PathBuf)> {
        FileKind::ALL
            .into_iter()
            .flat_map(move |kind| self.list(kind).iter().map(move |p| (kind, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_other_is_not_media() {
        assert!(FileKind::Image.is_media());
        assert!(FileKind::Document.is_media());
        assert!(!FileKind::Other.is_media());
    }

    #[test]
    fn normalize_sorts_and_dedups() {
        let mut files = ClassifiedFiles::default();
        files.push(FileKind::Image, PathBuf::from("/b.jpg"));
        files.push(FileKind::Image, PathBuf::from("/a.jpg"));
        files.push(FileKind::Image, PathBuf::from("/b.jpg"));
        files.normalize();

        assert_eq!(
            files.images,
            vec![PathBuf::from("/a.jpg"), PathBuf::from("/b.jpg")]
        );
        assert_eq!(files.total(), 2);
    }

    #[test]
    fn iter_walks_kinds_in_order() {
        let mut files = ClassifiedFiles::default();
        files.push(FileKind::Other, PathBuf::from("/x.bin"));
        files.push(FileKind::Image, PathBuf::from("/a.jpg"));

        let kinds: Vec<FileKind> = files.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![FileKind::Image, FileKind::Other]);
    }
}
