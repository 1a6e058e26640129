//! Per-run cache of resolved dates.

use crate::core::config::DateSource;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key: the file and the full ordered priority list used to resolve it
type CacheKey = (PathBuf, Vec<DateSource>);

/// In-memory date cache owned by one resolver
pub struct DateCache {
    entries: RwLock<HashMap<CacheKey, NaiveDateTime>>,
}

impl DateCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, path: &Path, priority: &[DateSource]) -> Option<NaiveDateTime> {
        let entries = self.entries.read().ok()?;
        entries
            .get(&(path.to_path_buf(), priority.to_vec()))
            .copied()
    }

    pub fn set(&self, path: &Path, priority: &[DateSource], date: NaiveDateTime) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((path.to_path_buf(), priority.to_vec()), date);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DateCache {
    fn default() -> Self {
        Self::new()
    }
}
