//! # Dates Module
//!
//! Best-guess timestamp for a file from a prioritized list of sources.
//!
//! Each source is tried in order and the first value with a year after 1970
//! wins. When every source fails the modification time is used; when even
//! that cannot be read the result is "now" (file exists) or 1900-01-01
//! (file cannot be stat'ed). Resolution never fails.

mod cache;
mod filename;

pub use cache::DateCache;
pub use filename::{date_from_filename, parse_filename_date};

use crate::core::config::DateSource;
use crate::core::fileops;
use crate::core::metadata::{is_exif_capable, is_video_container, MetadataProvider, SystemMetadata};
use chrono::{Datelike, Local, NaiveDateTime};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Dates at or before this year are treated as missing
pub const MIN_PLAUSIBLE_YEAR: i32 = 1970;

/// Resolves and caches file dates
pub struct DateResolver {
    metadata: Arc<dyn MetadataProvider>,
    cache: DateCache,
}

impl DateResolver {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            metadata,
            cache: DateCache::new(),
        }
    }

    /// Resolver backed by EXIF and ffprobe
    pub fn system() -> Self {
        Self::new(Arc::new(SystemMetadata::new()))
    }

    /// Resolve the date of `path` using `priority`.
    pub fn resolve(&self, path: &Path, priority: &[DateSource]) -> NaiveDateTime {
        if let Some(cached) = self.cache.get(path, priority) {
            return cached;
        }

        let resolved = priority
            .iter()
            .find_map(|source| {
                let date = self
                    .from_source(path, *source)
                    .filter(|date| date.year() > MIN_PLAUSIBLE_YEAR)?;
                debug!("{}: date from {}", path.display(), source.name());
                Some(date)
            })
            .unwrap_or_else(|| fallback_date(path));

        self.cache.set(path, priority, resolved);
        resolved
    }

    /// Value of a single source, without plausibility filtering
    pub fn from_source(&self, path: &Path, source: DateSource) -> Option<NaiveDateTime> {
        match source {
            DateSource::Exif if is_exif_capable(path) => self.metadata.image_date(path),
            DateSource::Metadata if is_video_container(path) => self.metadata.video_date(path),
            DateSource::Exif | DateSource::Metadata => None,
            DateSource::Filename => date_from_filename(path),
            DateSource::Filetime => fileops::modified_time(path),
            DateSource::Creationtime => fileops::created_time(path),
            DateSource::Filesystem => fileops::accessed_time(path),
        }
    }

    /// Forget all cached dates
    pub fn reset(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

fn fallback_date(path: &Path) -> NaiveDateTime {
    if let Some(modified) = fileops::modified_time(path) {
        return modified;
    }
    if path.metadata().is_ok() {
        warn!("No modification time for {}, using current time", path.display());
        Local::now().naive_local()
    } else {
        warn!("Cannot stat {}, using sentinel date", path.display());
        fileops::sentinel_date()
    }
}
