//! Move phase: carries out a [`FolderPlan`] one file at a time.
//!
//! Moves run strictly in plan order on the calling thread so the rollback
//! log matches what happened on disk.

use super::control::{RunControl, Terminated};
use super::planner::{FolderPlan, PlannedMove};
use super::progress::ProgressReporter;
use super::rollback::{RollbackEntry, RollbackLog};
use super::types::RunStats;
use crate::core::dedup::Deduplicator;
use crate::core::fileops::{remove_empty_parents, safe_move, unique_path};
use crate::events::{Event, MessageLevel};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Overall-bar window of the move phase within a pass
pub const MOVE_PROGRESS_START: u8 = 30;
pub const MOVE_PROGRESS_END: u8 = 70;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the move phase reads or updates
pub struct MoveContext<'a> {
    pub dedup: &'a Deduplicator,
    pub control: &'a RunControl,
    pub progress: &'a ProgressReporter,
    pub rollback: &'a mut RollbackLog,
    pub stats: &'a mut RunStats,
    /// Emptied source directories are pruned up to here
    pub source_root: &'a Path,
    /// Delete sources that already exist at the target
    pub remove_duplicates: bool,
}

/// What ended up happening to one planned move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(PathBuf),
    AlreadyInPlace,
    Duplicate { kept: PathBuf },
    Failed,
}

/// Files per target folder, keyed by size, for duplicate lookups
#[derive(Default)]
struct FolderIndex {
    folders: HashMap<PathBuf, HashMap<u64, Vec<PathBuf>>>,
}

impl FolderIndex {
    fn folder(&mut self, folder: &Path) -> &mut HashMap<u64, Vec<PathBuf>> {
        self.folders
            .entry(folder.to_path_buf())
            .or_insert_with(|| index_folder(folder))
    }

    fn candidates(&mut self, folder: &Path, size: u64) -> Vec<PathBuf> {
        self.folder(folder).get(&size).cloned().unwrap_or_default()
    }

    fn insert(&mut self, folder: &Path, size: u64, path: PathBuf) {
        self.folder(folder).entry(size).or_default().push(path);
    }
}

fn index_folder(folder: &Path) -> HashMap<u64, Vec<PathBuf>> {
    let mut by_size: HashMap<u64, Vec<PathBuf>> = HashMap::new();
    let Ok(entries) = fs::read_dir(folder) else {
        return by_size;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        if let Ok(meta) = entry.metadata() {
            if meta.is_file() {
                by_size.entry(meta.len()).or_default().push(entry.path());
            }
        }
    }
    by_size
}

pub struct MoveExecutor;

impl MoveExecutor {
    /// Execute every planned move. Stops with `Err(Terminated)` at the first
    /// checkpoint after a terminate request; completed moves stay logged.
    pub fn execute(plan: &FolderPlan, mut ctx: MoveContext<'_>) -> Result<(), Terminated> {
        let total = plan.moves.len();
        let mut index = FolderIndex::default();
        let mut last_progress = Instant::now();

        for (done, planned) in plan.moves.iter().enumerate() {
            ctx.control.checkpoint_with(ctx.progress)?;

            Self::execute_one(planned, &mut ctx, &mut index);

            if last_progress.elapsed() >= PROGRESS_INTERVAL || done + 1 == total {
                ctx.progress.report(
                    window_percent(done + 1, total),
                    MessageLevel::Progress,
                    format!("Moved {}/{} files", done + 1, total),
                );
                last_progress = Instant::now();
            }
        }

        Ok(())
    }

    fn execute_one(
        planned: &PlannedMove,
        ctx: &mut MoveContext<'_>,
        index: &mut FolderIndex,
    ) -> MoveOutcome {
        let MoveContext {
            dedup,
            progress,
            rollback,
            stats,
            source_root,
            remove_duplicates,
            ..
        } = ctx;
        let source = &planned.source;
        let target = planned.target();

        if *source == target {
            stats.record(planned.kind);
            stats.record_placement(&planned.folder);
            return MoveOutcome::AlreadyInPlace;
        }

        let size = match fs::metadata(source) {
            Ok(meta) => meta.len(),
            Err(e) => {
                error!("Cannot read {}: {}", source.display(), e);
                progress.message(
                    MessageLevel::Error,
                    format!("Failed to move {}: {}", source.display(), e),
                );
                stats.failed_moves += 1;
                return MoveOutcome::Failed;
            }
        };

        if *remove_duplicates {
            if let Some(kept) = find_identical(dedup, index, source, &target, &planned.folder, size) {
                match fs::remove_file(source) {
                    Ok(()) => {
                        debug!("Removed {} (identical to {})", source.display(), kept.display());
                        dedup.forget(source);
                        if let Some(parent) = source.parent() {
                            remove_empty_parents(parent, Some(*source_root));
                        }
                        rollback.push(RollbackEntry::DuplicateRemoved {
                            original: source.clone(),
                            kept: kept.clone(),
                        });
                        stats.record(planned.kind);
                        stats.identical_files_removed += 1;
                        progress.events().send(Event::DuplicateRemoved {
                            path: source.clone(),
                            kept: kept.clone(),
                        });
                        return MoveOutcome::Duplicate { kept };
                    }
                    Err(e) => warn!("Could not remove duplicate {}: {}", source.display(), e),
                }
            }
        }

        let target = unique_path(&target);
        match safe_move(source, &target, Some(*source_root)) {
            Ok(()) => {
                rollback.record_move(source, &target);
                dedup.forget(source);
                stats.record(planned.kind);
                stats.record_placement(&planned.folder);
                index.insert(&planned.folder, size, target.clone());
                progress.events().send(Event::FileMoved {
                    from: source.clone(),
                    to: target.clone(),
                });
                MoveOutcome::Moved(target)
            }
            Err(e) => {
                error!("{}", e);
                progress.message(MessageLevel::Error, format!("Failed to move file: {}", e));
                stats.failed_moves += 1;
                MoveOutcome::Failed
            }
        }
    }
}

/// An existing file identical to `source`: the planned target first, then
/// anything of the same size already in the target folder.
fn find_identical(
    dedup: &Deduplicator,
    index: &mut FolderIndex,
    source: &Path,
    target: &Path,
    folder: &Path,
    size: u64,
) -> Option<PathBuf> {
    if target.is_file() && dedup.identical(source, target) {
        return Some(target.to_path_buf());
    }
    index
        .candidates(folder, size)
        .into_iter()
        .filter(|candidate| candidate != source && candidate != target)
        .find(|candidate| candidate.is_file() && dedup.identical(source, candidate))
}

/// Local pass percent for `done` of `total` moves
fn window_percent(done: usize, total: usize) -> u8 {
    let span = usize::from(MOVE_PROGRESS_END - MOVE_PROGRESS_START);
    let offset = if total == 0 { span } else { done * span / total };
    MOVE_PROGRESS_START + offset.min(span) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::organize::types::DateKey;
    use crate::core::scanner::FileKind;
    use crate::events::EventChannel;
    use tempfile::TempDir;

    struct Fixture {
        dedup: Deduplicator,
        control: RunControl,
        progress: ProgressReporter,
        rollback: RollbackLog,
        stats: RunStats,
    }

    impl Fixture {
        fn new() -> Self {
            let (tx, _rx) = EventChannel::new();
            Self {
                dedup: Deduplicator::new(),
                control: RunControl::new(),
                progress: ProgressReporter::new(tx, 0, 100),
                rollback: RollbackLog::new(),
                stats: RunStats::default(),
            }
        }

        fn run(&mut self, plan: &FolderPlan, root: &Path) -> Result<(), Terminated> {
            MoveExecutor::execute(
                plan,
                MoveContext {
                    dedup: &self.dedup,
                    control: &self.control,
                    progress: &self.progress,
                    rollback: &mut self.rollback,
                    stats: &mut self.stats,
                    source_root: root,
                    remove_duplicates: true,
                },
            )
        }
    }

    fn planned(source: PathBuf, folder: PathBuf, name: &str) -> PlannedMove {
        PlannedMove {
            source,
            kind: FileKind::Image,
            key: DateKey::Dated("2024".into()),
            folder,
            file_name: name.to_string(),
        }
    }

    fn plan(moves: Vec<PlannedMove>) -> FolderPlan {
        FolderPlan {
            moves,
            ..FolderPlan::default()
        }
    }

    #[test]
    fn moves_files_and_logs_them() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir(src.path().join("trip")).unwrap();
        let a = src.path().join("trip/a.jpg");
        fs::write(&a, b"a").unwrap();
        let folder = dest.path().join("2024");

        let mut fx = Fixture::new();
        fx.run(&plan(vec![planned(a.clone(), folder.clone(), "2024-01-01 [01].jpg")]), src.path())
            .unwrap();

        assert!(folder.join("2024-01-01 [01].jpg").exists());
        assert!(!src.path().join("trip").exists());
        assert_eq!(fx.rollback.len(), 1);
        assert_eq!(fx.stats.images, 1);
        assert_eq!(fx.stats.folder_counts.get(&folder), Some(&1));
    }

    #[test]
    fn identical_files_collapse_to_one() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let a = src.path().join("a.jpg");
        let b = src.path().join("b.jpg");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();
        let folder = dest.path().join("2024");

        let mut fx = Fixture::new();
        fx.run(
            &plan(vec![
                planned(a, folder.clone(), "x [01].jpg"),
                planned(b.clone(), folder.clone(), "x [02].jpg"),
            ]),
            src.path(),
        )
        .unwrap();

        assert_eq!(fs::read_dir(&folder).unwrap().count(), 1);
        assert!(!b.exists());
        assert_eq!(fx.stats.identical_files_removed, 1);
        assert_eq!(fx.stats.images, 2);
    }

    #[test]
    fn occupied_target_gets_unique_name() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let a = src.path().join("a.jpg");
        fs::write(&a, b"new content").unwrap();
        let folder = dest.path().join("2024");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("x [01].jpg"), b"old").unwrap();

        let mut fx = Fixture::new();
        fx.run(&plan(vec![planned(a, folder.clone(), "x [01].jpg")]), src.path())
            .unwrap();

        assert_eq!(fs::read(folder.join("x [01]_1.jpg")).unwrap(), b"new content");
        assert_eq!(fs::read(folder.join("x [01].jpg")).unwrap(), b"old");
    }

    #[test]
    fn missing_source_is_counted_as_failure() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let mut fx = Fixture::new();
        fx.run(
            &plan(vec![planned(src.path().join("gone.jpg"), dest.path().join("2024"), "a.jpg")]),
            src.path(),
        )
        .unwrap();

        assert_eq!(fx.stats.failed_moves, 1);
        assert_eq!(fx.stats.total_processed(), 0);
        assert!(fx.rollback.is_empty());
    }

    #[test]
    fn terminate_stops_before_next_file() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let a = src.path().join("a.jpg");
        fs::write(&a, b"a").unwrap();

        let mut fx = Fixture::new();
        fx.control.terminate();
        let result = fx.run(&plan(vec![planned(a.clone(), dest.path().join("2024"), "a.jpg")]), src.path());

        assert_eq!(result, Err(Terminated));
        assert!(a.exists());
    }

    #[test]
    fn window_percent_spans_move_phase() {
        assert_eq!(window_percent(0, 10), 30);
        assert_eq!(window_percent(5, 10), 50);
        assert_eq!(window_percent(10, 10), 70);
    }
}
