//! Post-run folder compaction.
//!
//! Removes empty directories, then renames multi-part date folders
//! (`2024[1-3]`, `2024[3-3]`, ...) so each date's parts are numbered
//! `1..total` again, or collapse to the bare name when one part remains.

use crate::core::fileops::{remove_empty_dirs, unique_path};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

fn part_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)(?:\[(\d+)-(\d+)\])?$").ok())
        .as_ref()
}

/// What a renumbering pass changed on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenumberReport {
    pub removed_dirs: Vec<PathBuf>,
    /// Directory renames in the order they happened, temporary names included.
    /// Replaying them in order maps any old path to its final path.
    pub renames: Vec<(PathBuf, PathBuf)>,
}

/// A folder name split into date base and part index
#[derive(Debug, Clone, PartialEq, Eq)]
struct FolderPart {
    name: String,
    base: String,
    index: usize,
    suffixed: bool,
}

fn parse_part(name: &str) -> Option<FolderPart> {
    let captures = part_pattern()?.captures(name)?;
    let base = captures.get(1)?.as_str().to_string();
    let index = match captures.get(2) {
        Some(index) => index.as_str().parse().ok()?,
        None => 1,
    };
    Some(FolderPart {
        name: name.to_string(),
        base,
        index,
        suffixed: captures.get(2).is_some(),
    })
}

/// Numeric base and part index of a date folder name (`2024[2-3]` gives
/// `(2024, 2)`, `03` gives `(3, 1)`)
pub fn date_part(name: &str) -> Option<(u32, usize)> {
    let part = parse_part(name)?;
    Some((part.base.parse().ok()?, part.index))
}

/// Target name for part `index` of `total`
pub fn part_name(base: &str, index: usize, total: usize) -> String {
    if total == 1 {
        base.to_string()
    } else {
        format!("{}[{}-{}]", base, index, total)
    }
}

pub struct Renumberer;

impl Renumberer {
    pub fn run(dest: &Path) -> RenumberReport {
        let mut report = RenumberReport {
            removed_dirs: remove_empty_dirs(dest),
            renames: Vec::new(),
        };

        // Children before parents, so renaming a parent never invalidates
        // paths still to be visited.
        let directories: Vec<PathBuf> = WalkDir::new(dest)
            .contents_first(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();

        for dir in directories {
            renumber_children(&dir, &mut report.renames);
        }

        if !report.renames.is_empty() {
            debug!("Renumbered folders under {}: {} renames", dest.display(), report.renames.len());
        }
        report
    }
}

fn renumber_children(dir: &Path, renames: &mut Vec<(PathBuf, PathBuf)>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read {}: {}", dir.display(), e);
            return;
        }
    };

    let mut groups: BTreeMap<String, Vec<FolderPart>> = BTreeMap::new();
    for entry in entries.filter_map(|e| e.ok()) {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(part) = parse_part(&name) {
            groups.entry(part.base.clone()).or_default().push(part);
        }
    }

    for (base, mut parts) in groups {
        if !parts.iter().any(|p| p.suffixed) {
            continue;
        }
        parts.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.name.cmp(&b.name)));

        let total = parts.len();
        let planned: Vec<(String, String)> = parts
            .iter()
            .enumerate()
            .map(|(i, part)| (part.name.clone(), part_name(&base, i + 1, total)))
            .filter(|(old, new)| old != new)
            .collect();
        if planned.is_empty() {
            continue;
        }

        // Two phases through hidden temporary names so `[2-3] -> [1-2]`
        // never lands on a folder that has not moved yet.
        let mut staged = Vec::with_capacity(planned.len());
        for (old, new) in planned {
            let from = dir.join(&old);
            let temp = dir.join(format!(".renumber-{}", Uuid::new_v4()));
            match fs::rename(&from, &temp) {
                Ok(()) => {
                    renames.push((from.clone(), temp.clone()));
                    staged.push((temp, dir.join(new), from));
                }
                Err(e) => warn!("Failed to rename {}: {}", from.display(), e),
            }
        }
        for (temp, target, original) in staged {
            settle(&temp, &target, &original, renames);
        }
    }
}

/// Give a staged folder its final name. An occupied target sends it back to
/// its original name, or to a free variant of the target; it never stays
/// hidden while any visible name is available.
fn settle(temp: &Path, target: &Path, original: &Path, renames: &mut Vec<(PathBuf, PathBuf)>) {
    let mut candidates = Vec::with_capacity(3);
    if target.exists() {
        warn!("Cannot renumber to {}: already exists", target.display());
    } else {
        candidates.push(target.to_path_buf());
    }
    candidates.push(original.to_path_buf());
    candidates.push(unique_path(target));

    for candidate in candidates {
        if candidate.exists() {
            continue;
        }
        match fs::rename(temp, &candidate) {
            Ok(()) => {
                renames.push((temp.to_path_buf(), candidate));
                return;
            }
            Err(e) => warn!("Failed to rename {} to {}: {}", temp.display(), candidate.display(), e),
        }
    }
    warn!("{} keeps its temporary name", temp.display());
}
