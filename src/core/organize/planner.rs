//! Folder planning: how many folders each date key needs, which file goes
//! where, and what each file is called.

use super::naming::{dated_folder, default_dated_folder, file_base_name};
use super::types::*;
use crate::core::config::{NamingMode, OrganizerConfig};
use crate::core::scanner::FileKind;
use crate::error::NamingError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Kinds placed into dated folders, in assignment order
const MEDIA_KINDS: [FileKind; 3] = [FileKind::Image, FileKind::Video, FileKind::Document];

/// One target folder and the number of files it is meant to hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFolder {
    pub path: PathBuf,
    pub budget: usize,
    pub assigned: usize,
}

/// Target folders of one date key
#[derive(Debug, Clone)]
pub struct FolderAssignment {
    pub key: DateKey,
    pub folders: Vec<PlannedFolder>,
}

/// A single file move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub kind: FileKind,
    pub key: DateKey,
    pub folder: PathBuf,
    /// File name including the original extension
    pub file_name: String,
}

impl PlannedMove {
    pub fn target(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }
}

/// Everything the move phase needs
#[derive(Debug, Clone, Default)]
pub struct FolderPlan {
    pub assignments: Vec<FolderAssignment>,
    pub moves: Vec<PlannedMove>,
    /// Templates that fell back to default naming
    pub warnings: Vec<NamingError>,
    /// Other-kind files left in place because organizing them is disabled
    pub skipped_others: usize,
}

/// Builds a [`FolderPlan`] from date buckets
pub struct FolderPlanner<'a> {
    config: &'a OrganizerConfig,
    dest: &'a Path,
}

impl<'a> FolderPlanner<'a> {
    pub fn new(config: &'a OrganizerConfig, dest: &'a Path) -> Self {
        Self { config, dest }
    }

    /// Number of folders a key with `media_len` files needs
    pub fn folder_count(media_len: usize, capacity: usize) -> usize {
        if capacity == 0 {
            1
        } else {
            media_len.div_ceil(capacity).max(1)
        }
    }

    /// Folder index for each of `len` files: fill each folder to capacity,
    /// then spill into the next. Anything beyond the last folder's capacity
    /// stays in the last folder.
    pub fn assign_slots(len: usize, capacity: usize, folder_count: usize) -> Vec<usize> {
        let last = folder_count.saturating_sub(1);
        (0..len)
            .map(|slot| if capacity == 0 { 0 } else { (slot / capacity).min(last) })
            .collect()
    }

    pub fn no_date_folder(&self) -> PathBuf {
        self.dest.join(&self.config.no_date_files_folder)
    }

    /// Other-files folder; never the same folder as the no-date folder
    pub fn other_folder(&self) -> PathBuf {
        if self.config.other_files_folder == self.config.no_date_files_folder {
            self.dest
                .join(format!("{}_other", self.config.other_files_folder))
        } else {
            self.dest.join(&self.config.other_files_folder)
        }
    }

    pub fn plan(&self, buckets: &DateBuckets) -> FolderPlan {
        let mut plan = FolderPlan::default();
        let capacity = self.config.max_files_per_folder as usize;

        // Folder -> owning date key; sinks have no owner
        let mut claimed: HashMap<PathBuf, Option<DateKey>> = HashMap::new();
        claimed.insert(self.no_date_folder(), None);
        claimed.insert(self.other_folder(), None);

        for (key, bucket) in buckets.iter() {
            match key {
                DateKey::Dated(_) => {
                    self.plan_dated(key, bucket, capacity, &mut claimed, &mut plan)
                }
                DateKey::NoDate => self.plan_no_date(bucket, &mut plan),
            }
            self.plan_others(key, bucket, &mut plan);
        }

        plan
    }

    fn plan_dated(
        &self,
        key: &DateKey,
        bucket: &DateBucket,
        capacity: usize,
        claimed: &mut HashMap<PathBuf, Option<DateKey>>,
        plan: &mut FolderPlan,
    ) {
        let media_len = bucket.media_len();
        if media_len == 0 {
            return;
        }

        let folder_count = Self::folder_count(media_len, capacity);
        let mut folders: Vec<PlannedFolder> = (1..=folder_count)
            .map(|index| {
                let path = self.folder_path(key, index, folder_count, claimed, plan);
                let budget = if capacity == 0 {
                    media_len
                } else {
                    capacity.min(media_len - (index - 1) * capacity)
                };
                PlannedFolder {
                    path,
                    budget,
                    assigned: 0,
                }
            })
            .collect();

        let slots = Self::assign_slots(media_len, capacity, folder_count);
        let mut slot = 0;

        for kind in MEDIA_KINDS {
            let files = bucket.list(kind);
            for (position, file) in files.iter().enumerate() {
                let folder = &mut folders[slots[slot]];
                folder.assigned += 1;
                slot += 1;

                let file_name = self.file_name(file, position + 1, files.len(), true, plan);
                plan.moves.push(PlannedMove {
                    source: file.path.clone(),
                    kind,
                    key: key.clone(),
                    folder: folder.path.clone(),
                    file_name,
                });
            }
        }

        for folder in folders.iter().filter(|f| capacity > 0 && f.assigned > capacity) {
            warn!(
                "{} holds {} files, over the capacity of {}",
                folder.path.display(),
                folder.assigned,
                capacity
            );
        }

        plan.assignments.push(FolderAssignment {
            key: key.clone(),
            folders,
        });
    }

    /// Folder for part `index` of `key`. A custom name that another date or
    /// a sink already owns falls back to the default layout.
    fn folder_path(
        &self,
        key: &DateKey,
        index: usize,
        total: usize,
        claimed: &mut HashMap<PathBuf, Option<DateKey>>,
        plan: &mut FolderPlan,
    ) -> PathBuf {
        let rendered = dated_folder(self.dest, key, index, total, self.config).and_then(|path| {
            match claimed.get(&path) {
                Some(Some(owner)) if owner == key => Ok(path),
                None => Ok(path),
                Some(_) => Err(NamingError::SharedFolder {
                    template: self.config.folder_naming_pattern.clone(),
                    folder: path,
                }),
            }
        });
        let path = match rendered {
            Ok(path) => path,
            Err(e) => {
                warn!("Folder naming for {} fell back to default: {}", key, e);
                plan.warnings.push(e);
                default_dated_folder(self.dest, key, index, total)
            }
        };
        claimed.entry(path.clone()).or_insert_with(|| Some(key.clone()));
        path
    }

    fn plan_no_date(&self, bucket: &DateBucket, plan: &mut FolderPlan) {
        let media_len = bucket.media_len();
        if media_len == 0 {
            return;
        }
        let folder = self.no_date_folder();

        for kind in MEDIA_KINDS {
            let files = bucket.list(kind);
            for (position, file) in files.iter().enumerate() {
                let file_name = if self.config.rename_no_date_files {
                    self.file_name(file, position + 1, files.len(), false, plan)
                } else {
                    original_name(&file.path)
                };
                plan.moves.push(PlannedMove {
                    source: file.path.clone(),
                    kind,
                    key: DateKey::NoDate,
                    folder: folder.clone(),
                    file_name,
                });
            }
        }

        plan.assignments.push(FolderAssignment {
            key: DateKey::NoDate,
            folders: vec![PlannedFolder {
                path: folder,
                budget: media_len,
                assigned: media_len,
            }],
        });
    }

    fn plan_others(&self, key: &DateKey, bucket: &DateBucket, plan: &mut FolderPlan) {
        if bucket.others.is_empty() {
            return;
        }
        if !self.config.organize_other_files {
            plan.skipped_others += bucket.others.len();
            return;
        }
        let folder = match key {
            DateKey::NoDate => self.no_date_folder(),
            DateKey::Dated(_) => self.other_folder(),
        };
        for file in &bucket.others {
            plan.moves.push(PlannedMove {
                source: file.path.clone(),
                kind: FileKind::Other,
                key: key.clone(),
                folder: folder.clone(),
                file_name: original_name(&file.path),
            });
        }
    }

    fn file_name(
        &self,
        file: &MediaFile,
        sequence: usize,
        series_len: usize,
        dated: bool,
        plan: &mut FolderPlan,
    ) -> String {
        let date = dated.then_some(file.date);
        let base = match file_base_name(date, sequence, series_len, self.config) {
            Ok(base) => base,
            Err(e) => {
                if !plan.warnings.contains(&e) {
                    warn!("File naming fell back to default: {}", e);
                    plan.warnings.push(e);
                }
                let defaults = OrganizerConfig {
                    file_naming_mode: NamingMode::Default,
                    ..self.config.clone()
                };
                file_base_name(date, sequence, series_len, &defaults)
                    .unwrap_or_else(|_| original_stem(&file.path))
            }
        };
        with_extension(base, &file.path)
    }
}

fn original_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn original_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn with_extension(base: String, source: &Path) -> String {
    match source.extension() {
        Some(ext) => format!("{}.{}", base, ext.to_string_lossy()),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OrganizationMode;
    use std::collections::HashMap;
    use chrono::{NaiveDate, NaiveDateTime};

    fn moves_per_folder(plan: &FolderPlan) -> HashMap<PathBuf, usize> {
        let mut counts = HashMap::new();
        for planned in &plan.moves {
            *counts.entry(planned.folder.clone()).or_insert(0) += 1;
        }
        counts
    }

    fn at(y: i32, m: u32, d: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, second / 60, second % 60)
            .unwrap()
    }

    fn media(name: &str, kind: FileKind, date: NaiveDateTime) -> MediaFile {
        MediaFile {
            path: PathBuf::from(format!("/in/{}", name)),
            kind,
            date,
        }
    }

    fn buckets(files: Vec<MediaFile>, mode: OrganizationMode) -> DateBuckets {
        let mut buckets = DateBuckets::new();
        for file in files {
            let key = DateKey::for_file(&file, mode);
            buckets.insert(key, file);
        }
        buckets.sort();
        buckets
    }

    #[test]
    fn folder_count_is_ceiling() {
        assert_eq!(FolderPlanner::folder_count(150, 100), 2);
        assert_eq!(FolderPlanner::folder_count(100, 100), 1);
        assert_eq!(FolderPlanner::folder_count(201, 100), 3);
        assert_eq!(FolderPlanner::folder_count(5000, 0), 1);
        assert_eq!(FolderPlanner::folder_count(0, 100), 1);
    }

    #[test]
    fn slots_fill_then_spill() {
        let slots = FolderPlanner::assign_slots(250, 100, 3);
        assert_eq!(slots.iter().filter(|s| **s == 0).count(), 100);
        assert_eq!(slots.iter().filter(|s| **s == 1).count(), 100);
        assert_eq!(slots.iter().filter(|s| **s == 2).count(), 50);
    }

    #[test]
    fn overflow_goes_to_last_folder() {
        let slots = FolderPlanner::assign_slots(5, 2, 2);
        assert_eq!(slots, vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn splits_150_yearly_files_into_two_folders() {
        let files = (0..150)
            .map(|i| media(&format!("IMG_{:03}.jpg", i), FileKind::Image, at(2024, 3, 15, i)))
            .collect();
        let config = OrganizerConfig::default();
        let dest = Path::new("/out");
        let plan = FolderPlanner::new(&config, dest).plan(&buckets(files, OrganizationMode::Yearly));

        let counts = moves_per_folder(&plan);
        assert_eq!(counts.get(Path::new("/out/2024[1-2]")), Some(&100));
        assert_eq!(counts.get(Path::new("/out/2024[2-2]")), Some(&50));
        assert_eq!(plan.moves[0].file_name, "2024-03-15 [001].jpg");
        assert_eq!(plan.moves[149].file_name, "2024-03-15 [150].jpg");
        assert_eq!(plan.moves[149].folder, PathBuf::from("/out/2024[2-2]"));
    }

    #[test]
    fn kinds_share_folder_capacity_but_not_sequences() {
        let mut files: Vec<MediaFile> = (0..80)
            .map(|i| media(&format!("p{}.jpg", i), FileKind::Image, at(2023, 1, 1, i)))
            .collect();
        files.extend((0..40).map(|i| media(&format!("v{}.mp4", i), FileKind::Video, at(2023, 1, 1, i))));
        let config = OrganizerConfig::default();
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Yearly));

        let counts = moves_per_folder(&plan);
        assert_eq!(counts.get(Path::new("/out/2023[1-2]")), Some(&100));
        assert_eq!(counts.get(Path::new("/out/2023[2-2]")), Some(&20));

        let first_video = plan.moves.iter().find(|m| m.kind == FileKind::Video).unwrap();
        assert_eq!(first_video.file_name, "2023-01-01 [01].mp4");
    }

    #[test]
    fn unlimited_capacity_uses_one_folder() {
        let files = (0..250)
            .map(|i| media(&format!("{}.jpg", i), FileKind::Image, at(2022, 6, 1, i)))
            .collect();
        let config = OrganizerConfig::default().with_capacity(0).unwrap();
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Monthly));

        let counts = moves_per_folder(&plan);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(Path::new("/out/2022/06")), Some(&250));
    }

    #[test]
    fn no_date_and_other_files_go_to_sinks() {
        let files = vec![
            media("scan.jpg", FileKind::Image, at(1970, 1, 1, 0)),
            media("notes.xyz", FileKind::Other, at(2020, 1, 1, 0)),
        ];
        let config = OrganizerConfig::default();
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Yearly));

        let no_date = plan.moves.iter().find(|m| m.kind == FileKind::Image).unwrap();
        assert_eq!(no_date.folder, PathBuf::from("/out/No Date"));
        assert_eq!(no_date.file_name, "No Date [01].jpg");

        let other = plan.moves.iter().find(|m| m.kind == FileKind::Other).unwrap();
        assert_eq!(other.folder, PathBuf::from("/out/Other Files"));
        assert_eq!(other.file_name, "notes.xyz");
    }

    #[test]
    fn no_date_files_keep_names_when_renaming_disabled() {
        let files = vec![media("scan.JPG", FileKind::Image, at(1960, 1, 1, 0))];
        let config = OrganizerConfig::default().with_rename_no_date(false);
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Yearly));

        assert_eq!(plan.moves[0].file_name, "scan.JPG");
    }

    #[test]
    fn same_sink_names_stay_distinct() {
        let config = OrganizerConfig::default()
            .with_folder_names("Misc", "Misc")
            .unwrap();
        let planner = FolderPlanner::new(&config, Path::new("/out"));
        assert_ne!(planner.no_date_folder(), planner.other_folder());
        assert_eq!(planner.other_folder(), PathBuf::from("/out/Misc_other"));
    }

    #[test]
    fn disabled_other_files_are_skipped() {
        let files = vec![
            media("a.xyz", FileKind::Other, at(2020, 1, 1, 0)),
            media("b.xyz", FileKind::Other, at(1950, 1, 1, 0)),
        ];
        let config = OrganizerConfig::default().with_other_files(false);
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Yearly));

        assert!(plan.moves.is_empty());
        assert_eq!(plan.skipped_others, 2);
    }

    #[test]
    fn bad_folder_template_falls_back_with_warning() {
        let mut config = OrganizerConfig::default();
        config.folder_naming_mode = NamingMode::Custom;
        config.folder_naming_pattern = "{year}".into();
        let files = (0..150)
            .map(|i| media(&format!("{}.jpg", i), FileKind::Image, at(2024, 1, 1, i)))
            .collect();
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Yearly));

        assert!(!plan.warnings.is_empty());
        assert_eq!(plan.assignments[0].folders[0].path, PathBuf::from("/out/2024[1-2]"));
    }

    fn custom_folders(template: &str, mode: OrganizationMode) -> OrganizerConfig {
        OrganizerConfig::default()
            .with_organization_mode(mode)
            .with_folder_naming(NamingMode::Custom, template, "-")
    }

    #[test]
    fn custom_names_shared_by_two_months_keep_capacity() {
        let mut files: Vec<MediaFile> = (0..80)
            .map(|i| media(&format!("jan{}.jpg", i), FileKind::Image, at(2024, 1, 10, i)))
            .collect();
        files.extend((0..80).map(|i| media(&format!("feb{}.jpg", i), FileKind::Image, at(2024, 2, 10, i))));
        let config = custom_folders("{year}-{index}", OrganizationMode::Monthly);
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Monthly));

        let counts = moves_per_folder(&plan);
        assert!(counts.values().all(|count| *count <= 100), "{:?}", counts);
        assert_eq!(counts.get(Path::new("/out/2024-1")), Some(&80));
        assert_eq!(counts.get(Path::new("/out/2024/02")), Some(&80));
        assert!(plan
            .warnings
            .iter()
            .any(|w| matches!(w, NamingError::SharedFolder { .. })));
    }

    #[test]
    fn custom_name_cannot_leave_destination() {
        let files = vec![media("a.jpg", FileKind::Image, at(2024, 5, 1, 0))];
        for template in ["../escaped-{year}-{index}", "/abs/{year}-{index}", "./{year}-{index}"] {
            let config = custom_folders(template, OrganizationMode::Yearly);
            let plan = FolderPlanner::new(&config, Path::new("/out"))
                .plan(&buckets(files.clone(), OrganizationMode::Yearly));

            assert_eq!(plan.moves[0].folder, PathBuf::from("/out/2024"), "{}", template);
            assert!(plan
                .warnings
                .iter()
                .any(|w| matches!(w, NamingError::OutsideDestination { .. })));
        }
    }

    #[test]
    fn nested_custom_names_stay_inside_destination() {
        let files = vec![media("a.jpg", FileKind::Image, at(2024, 5, 1, 0))];
        let config = custom_folders("{year}/{month}-{index}", OrganizationMode::Monthly);
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Monthly));

        assert!(plan.warnings.is_empty());
        assert_eq!(plan.moves[0].folder, PathBuf::from("/out/2024/05-1"));
    }

    #[test]
    fn undated_other_files_go_to_no_date_folder() {
        let files = vec![
            media("old.xyz", FileKind::Other, at(1960, 1, 1, 0)),
            media("new.xyz", FileKind::Other, at(2021, 1, 1, 0)),
        ];
        let config = OrganizerConfig::default();
        let plan = FolderPlanner::new(&config, Path::new("/out"))
            .plan(&buckets(files, OrganizationMode::Yearly));

        let old = plan.moves.iter().find(|m| m.file_name == "old.xyz").unwrap();
        assert_eq!(old.folder, PathBuf::from("/out/No Date"));
        let new = plan.moves.iter().find(|m| m.file_name == "new.xyz").unwrap();
        assert_eq!(new.folder, PathBuf::from("/out/Other Files"));
    }
}
