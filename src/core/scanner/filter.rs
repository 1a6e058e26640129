//! Extension-based classification and skip rules for the scanner.

use super::FileKind;
use crate::core::config::{FormatSet, OrganizerConfig};
use std::path::Path;

/// Decides a file's kind and which entries the scanner never touches
#[derive(Debug, Clone)]
pub struct KindFilter {
    images: FormatSet,
    videos: FormatSet,
    documents: FormatSet,
    /// Lowercased marker; directories containing it are skipped
    backup_marker: String,
}

impl KindFilter {
    pub fn new(config: &OrganizerConfig) -> Self {
        Self {
            images: config.image_formats.clone(),
            videos: config.video_formats.clone(),
            documents: config.document_formats.clone(),
            backup_marker: config.backup_folder_name.to_lowercase(),
        }
    }

    /// Kind by extension. Declared other formats, unknown and missing
    /// extensions are all `Other`.
    pub fn classify(&self, path: &Path) -> FileKind {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return FileKind::Other;
        };

        if self.images.contains(ext) {
            FileKind::Image
        } else if self.videos.contains(ext) {
            FileKind::Video
        } else if self.documents.contains(ext) {
            FileKind::Document
        } else {
            FileKind::Other
        }
    }

    /// Hidden files and zip archives are never scanned
    pub fn skips_file(&self, path: &Path) -> bool {
        if is_hidden(path) {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false)
    }

    /// Hidden directories and anything that looks like a backup folder
    pub fn skips_dir(&self, path: &Path) -> bool {
        if is_hidden(path) {
            return true;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let lower = name.to_lowercase();
        lower.contains("backup") || (!self.backup_marker.is_empty() && lower.contains(&self.backup_marker))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
