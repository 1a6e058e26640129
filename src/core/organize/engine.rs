//! The organize engine.
//!
//! One pass runs `Backup → Scan → GroupByDate → PlanFolders → Move →
//! Cleanup`; a full run is an organize pass followed by a resort pass over
//! the destination. Every pass reports through a [`ProgressReporter`] whose
//! window maps the pass onto the overall bar.

use super::control::{RunControl, Terminated};
use super::executor::{MoveContext, MoveExecutor};
use super::planner::FolderPlanner;
use super::progress::ProgressReporter;
use super::renumber::{date_part, Renumberer};
use super::rollback::RollbackLog;
use super::types::*;
use crate::core::backup::{BackupArchiver, BackupOutcome};
use crate::core::config::OrganizerConfig;
use crate::core::dates::DateResolver;
use crate::core::dedup::Deduplicator;
use crate::core::metadata::{MetadataProvider, SystemMetadata};
use crate::core::scanner::{ClassifiedFiles, DirectoryScanner, ScanConfig};
use crate::error::{OrganizerError, Result, ScanError};
use crate::events::{EnginePhase, Event, EventSender, MessageLevel};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Share of the overall bar taken by the organize pass of a full run
const ORGANIZE_SCALE: u8 = 70;
/// The resort pass always reports into 70..=100
const RESORT_OFFSET: u8 = 70;
const RESORT_SCALE: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassMode {
    Organize { backup: bool },
    Resort,
}

impl PassMode {
    fn is_resort(self) -> bool {
        matches!(self, PassMode::Resort)
    }
}

/// Why a pass stopped early
enum PassStop {
    Terminated,
    Failed {
        phase: EnginePhase,
        error: OrganizerError,
    },
}

impl From<Terminated> for PassStop {
    fn from(_: Terminated) -> Self {
        PassStop::Terminated
    }
}

/// What a completed pass produced
struct PassResult {
    source: PathBuf,
    destination: PathBuf,
    archive: Option<PathBuf>,
    stats: RunStats,
    folder_summary: Vec<String>,
    /// Folder renames made by the cleanup phase, in order
    renames: Vec<(PathBuf, PathBuf)>,
}

/// Organizes a source tree into dated folders under a destination.
///
/// The engine owns every run-scoped cache and the rollback log; they are
/// reset at the start of each run.
pub struct OrganizeEngine {
    config: OrganizerConfig,
    resolver: DateResolver,
    dedup: Deduplicator,
    control: Arc<RunControl>,
    events: EventSender,
    rollback: RollbackLog,
    stats: RunStats,
    buckets: DateBuckets,
    phase: EnginePhase,
}

impl OrganizeEngine {
    /// Engine reading EXIF and ffprobe metadata
    pub fn new(config: OrganizerConfig, events: EventSender) -> Self {
        Self::with_metadata(config, events, Arc::new(SystemMetadata::new()))
    }

    pub fn with_metadata(
        config: OrganizerConfig,
        events: EventSender,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self {
            config,
            resolver: DateResolver::new(metadata),
            dedup: Deduplicator::new(),
            control: Arc::new(RunControl::new()),
            events,
            rollback: RollbackLog::new(),
            stats: RunStats::default(),
            buckets: DateBuckets::new(),
            phase: EnginePhase::Init,
        }
    }

    /// Shared pause/resume/terminate handle
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// Replace the configuration used by the next run
    pub fn set_config(&mut self, config: OrganizerConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Moves recorded since the last run started
    pub fn pending_rollback(&self) -> usize {
        self.rollback.len()
    }

    /// Organize `source` into `dest` without the resort pass.
    ///
    /// On termination the moves made so far stay in place and
    /// [`rollback`](Self::rollback) can undo them.
    pub fn organize(&mut self, source: &Path, dest: &Path, backup: bool) -> Result<RunOutcome> {
        let started = Instant::now();
        self.begin_run();
        let progress = ProgressReporter::new(self.events.clone(), 0, 100);

        match self.pass(source, dest, PassMode::Organize { backup }, &progress) {
            Ok(result) => {
                self.set_phase(EnginePhase::Done);
                Ok(RunOutcome::Completed(self.finish(result, 0, started)))
            }
            Err(stop) => self.stopped(stop),
        }
    }

    /// Re-sort the loose files at the top of `dest` and renumber its folders
    pub fn resort(&mut self, dest: &Path) -> Result<RunOutcome> {
        let started = Instant::now();
        self.begin_run();
        let progress = ProgressReporter::new(self.events.clone(), RESORT_OFFSET, RESORT_SCALE);

        match self.resort_pass(dest, &progress) {
            Ok(result) => {
                self.set_phase(EnginePhase::Done);
                let resorted = result.stats.total_processed();
                Ok(RunOutcome::Completed(self.finish(result, resorted, started)))
            }
            Err(stop) => self.stopped(stop),
        }
    }

    /// Organize pass followed by a resort pass.
    ///
    /// A terminated run is rolled back before this returns.
    pub fn run(&mut self, request: &RunRequest) -> Result<RunOutcome> {
        let started = Instant::now();
        self.begin_run();

        let scale = if request.resort { ORGANIZE_SCALE } else { 100 };
        let progress = ProgressReporter::new(self.events.clone(), 0, scale);
        let mode = PassMode::Organize {
            backup: request.backup,
        };

        let mut organized = match self.pass(&request.source, &request.destination, mode, &progress) {
            Ok(result) => result,
            Err(stop) => return self.stopped_with_rollback(stop, &request.destination),
        };

        let mut resorted = 0;
        if request.resort {
            let progress = ProgressReporter::new(self.events.clone(), RESORT_OFFSET, RESORT_SCALE);
            let resort = match self.resort_pass(&organized.destination, &progress) {
                Ok(result) => result,
                Err(stop) => return self.stopped_with_rollback(stop, &request.destination),
            };
            resorted = resort.stats.total_processed();
            for (old, new) in &resort.renames {
                organized.stats.rebase(old, new);
            }
            for (folder, count) in resort.stats.folder_counts {
                *organized.stats.folder_counts.entry(folder).or_insert(0) += count;
            }
            organized.folder_summary =
                folder_summary(&organized.stats, &organized.destination, &self.config);
        }

        self.set_phase(EnginePhase::Done);
        Ok(RunOutcome::Completed(self.finish(organized, resorted, started)))
    }

    /// Undo a terminated run: restore every moved file, then prune and
    /// renumber the destination.
    pub fn rollback(&mut self, dest: &Path) -> Result<RollbackReport> {
        if self.phase != EnginePhase::Terminated {
            return Err(OrganizerError::Phase {
                phase: EnginePhase::Rollback.to_string(),
                message: format!("nothing to roll back after phase '{}'", self.phase),
            });
        }

        self.set_phase(EnginePhase::Rollback);
        let progress = ProgressReporter::new(self.events.clone(), 0, 100);
        progress.message(
            MessageLevel::Info,
            format!("Rolling back {} changes...", self.rollback.len()),
        );

        let replayed = self.rollback.replay();
        let renumbered = if dest.is_dir() {
            Renumberer::run(dest)
        } else {
            Default::default()
        };

        let report = RollbackReport {
            restored: replayed.restored,
            failed: replayed.failed,
            removed_dirs: renumbered.removed_dirs.len(),
        };
        info!(
            "Rollback restored {} entries ({} failed)",
            report.restored, report.failed
        );

        self.stats = RunStats::default();
        self.buckets.clear();
        self.rollback.clear();
        self.events.send(Event::RolledBack {
            restored: report.restored,
            failed: report.failed,
        });
        let level = if report.failed == 0 {
            MessageLevel::Success
        } else {
            MessageLevel::Warning
        };
        progress.message(
            level,
            format!("Rollback finished: {} restored, {} failed", report.restored, report.failed),
        );

        self.set_phase(EnginePhase::Init);
        self.control.reset();
        Ok(report)
    }

    fn begin_run(&mut self) {
        self.phase = EnginePhase::Init;
        self.events.send(Event::PhaseChanged {
            phase: EnginePhase::Init,
        });
        self.control.reset();
        self.resolver.reset();
        self.dedup.reset();
        self.rollback.clear();
        self.stats = RunStats::default();
        self.buckets.clear();
    }

    fn set_phase(&mut self, next: EnginePhase) {
        if next == self.phase {
            return;
        }
        if !self.phase.can_transition_to(next) {
            warn!("Unexpected phase change {:?} -> {:?}", self.phase, next);
        }
        debug!("Phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        self.events.send(Event::PhaseChanged { phase: next });
    }

    /// Enter `next`, then stop if termination was requested
    fn enter(&mut self, next: EnginePhase, progress: &ProgressReporter) -> std::result::Result<(), PassStop> {
        self.set_phase(next);
        self.control.checkpoint_with(progress)?;
        Ok(())
    }

    fn failed(&self, error: impl Into<OrganizerError>) -> PassStop {
        PassStop::Failed {
            phase: self.phase,
            error: error.into(),
        }
    }

    fn stopped(&mut self, stop: PassStop) -> Result<RunOutcome> {
        match stop {
            PassStop::Terminated => {
                self.set_phase(EnginePhase::Terminated);
                info!("Run terminated; {} changes can be rolled back", self.rollback.len());
                self.events.send(Event::Terminated);
                Ok(RunOutcome::Terminated)
            }
            PassStop::Failed { phase, error } => {
                let message = error.to_string();
                warn!("{} failed: {}", phase, message);
                self.events.send(Event::Error {
                    phase,
                    message: message.clone(),
                });
                Err(OrganizerError::Phase {
                    phase: phase.to_string(),
                    message,
                })
            }
        }
    }

    fn stopped_with_rollback(&mut self, stop: PassStop, dest: &Path) -> Result<RunOutcome> {
        let outcome = self.stopped(stop)?;
        if outcome.is_terminated() {
            self.rollback(dest)?;
        }
        Ok(outcome)
    }

    fn resort_pass(
        &mut self,
        dest: &Path,
        progress: &ProgressReporter,
    ) -> std::result::Result<PassResult, PassStop> {
        self.enter(EnginePhase::Resort, progress)?;
        progress.report(5, MessageLevel::Progress, "Re-scanning destination...");
        self.resolver.reset();
        self.dedup.reset();
        let mut result = self.pass(dest, dest, PassMode::Resort, progress)?;
        result.stats.identical_files_removed = 0;
        Ok(result)
    }

    fn pass(
        &mut self,
        source: &Path,
        dest: &Path,
        mode: PassMode,
        progress: &ProgressReporter,
    ) -> std::result::Result<PassResult, PassStop> {
        let config = self.config.clone();
        self.stats = RunStats::default();
        self.buckets.clear();

        if !source.is_dir() {
            return Err(self.failed(ScanError::DirectoryNotFound {
                path: source.to_path_buf(),
            }));
        }
        fs::create_dir_all(dest).map_err(|e| {
            self.failed(OrganizerError::Io {
                path: dest.to_path_buf(),
                source: e,
            })
        })?;
        let source = canonical(source);
        let dest = canonical(dest);

        // Backup
        let mut archive = None;
        if let PassMode::Organize { backup: true } = mode {
            self.enter(EnginePhase::Backup, progress)?;
            archive = self.backup(&config, &source, &dest, progress)?;
        }

        // Scan
        self.enter(EnginePhase::Scan, progress)?;
        progress.report(16, MessageLevel::Progress, format!("Scanning {}...", source.display()));
        let scan_config = if mode.is_resort() {
            ScanConfig::resort()
        } else {
            ScanConfig::default()
        };
        let exclude = (dest != source).then_some(dest.as_path());
        let files = DirectoryScanner::new(&config, scan_config)
            .scan(&source, exclude)
            .map_err(|e| self.failed(e))?;
        progress.report(
            18,
            MessageLevel::Info,
            format!(
                "Found {} images, {} videos, {} documents, {} other files",
                files.images.len(),
                files.videos.len(),
                files.documents.len(),
                files.others.len()
            ),
        );

        if files.is_empty() {
            progress.report(100, MessageLevel::Success, "No files to organize");
            return Ok(PassResult {
                source,
                destination: dest,
                archive,
                stats: std::mem::take(&mut self.stats),
                folder_summary: Vec::new(),
                renames: Vec::new(),
            });
        }

        // Group by date
        self.enter(EnginePhase::GroupByDate, progress)?;
        self.group_by_date(&config, &files, progress)?;

        // Plan
        self.enter(EnginePhase::PlanFolders, progress)?;
        let plan = FolderPlanner::new(&config, &dest).plan(&self.buckets);
        for warning in &plan.warnings {
            progress.message(
                MessageLevel::Warning,
                format!("Custom naming failed, using default naming: {}", warning),
            );
        }
        self.stats.skipped_others = plan.skipped_others;
        progress.report(
            30,
            MessageLevel::Progress,
            format!("Planned {} moves into {} date groups", plan.moves.len(), plan.assignments.len()),
        );

        // Move
        self.enter(EnginePhase::Move, progress)?;
        MoveExecutor::execute(
            &plan,
            MoveContext {
                dedup: &self.dedup,
                control: &self.control,
                progress,
                rollback: &mut self.rollback,
                stats: &mut self.stats,
                source_root: &source,
                remove_duplicates: !mode.is_resort(),
            },
        )?;

        // Cleanup
        self.enter(EnginePhase::Cleanup, progress)?;
        let renumbered = Renumberer::run(&dest);
        for (old, new) in &renumbered.renames {
            self.rollback.rebase(old, new);
            self.stats.rebase(old, new);
        }
        progress.report(75, MessageLevel::Progress, "Moved files and cleaned up folders");

        let stats = std::mem::take(&mut self.stats);
        let folder_summary = folder_summary(&stats, &dest, &config);
        progress.report(100, MessageLevel::Success, summary_message(&stats, &folder_summary));
        info!(
            "Organized {} files from {} ({} duplicates removed, {} failed)",
            stats.total_processed(),
            source.display(),
            stats.identical_files_removed,
            stats.failed_moves
        );

        Ok(PassResult {
            source,
            destination: dest,
            archive,
            stats,
            folder_summary,
            renames: renumbered.renames,
        })
    }

    fn backup(
        &self,
        config: &OrganizerConfig,
        source: &Path,
        dest: &Path,
        progress: &ProgressReporter,
    ) -> std::result::Result<Option<PathBuf>, PassStop> {
        progress.report(0, MessageLevel::Progress, "Creating backup archive...");
        let control = Arc::clone(&self.control);
        let outcome = BackupArchiver::new(config).backup(
            source,
            dest,
            |done, total| {
                let percent = (done * 15 / total.max(1)) as u8;
                progress.report(percent, MessageLevel::Progress, format!("Backed up {}/{} files", done, total));
            },
            || control.checkpoint_with(progress).is_err(),
        );

        match outcome {
            Ok(BackupOutcome::Created(path)) => {
                progress.report(
                    15,
                    MessageLevel::Success,
                    format!("Backup written to {}", path.display()),
                );
                Ok(Some(path))
            }
            Ok(BackupOutcome::NothingToBackup) => {
                progress.report(15, MessageLevel::Info, "Nothing to back up");
                Ok(None)
            }
            Ok(BackupOutcome::Terminated) => Err(PassStop::Terminated),
            Err(e) => Err(self.failed(e)),
        }
    }

    fn group_by_date(
        &mut self,
        config: &OrganizerConfig,
        files: &ClassifiedFiles,
        progress: &ProgressReporter,
    ) -> std::result::Result<(), PassStop> {
        let total = files.total();
        progress.report(20, MessageLevel::Progress, format!("Reading dates of {} files...", total));

        for (done, (kind, path)) in files.iter().enumerate() {
            self.control.checkpoint_with(progress)?;

            let file = MediaFile {
                path: path.clone(),
                kind,
                date: self.resolver.resolve(path, &config.date_priority_list),
            };
            let key = DateKey::for_file(&file, config.organization_mode);
            self.buckets.insert(key, file);

            if done % 10 == 0 {
                let percent = 20 + (done * 5 / total.max(1)) as u8;
                progress.report(percent, MessageLevel::Progress, "");
            }
        }

        self.buckets.sort();
        progress.report(
            25,
            MessageLevel::Progress,
            format!("Grouped files into {} dates", self.buckets.len()),
        );
        Ok(())
    }

    fn finish(&self, result: PassResult, resorted: usize, started: Instant) -> RunReport {
        let summary = result.stats.summary();
        self.events.send(Event::Completed(summary));
        RunReport {
            run_id: Uuid::new_v4(),
            source: result.source,
            destination: result.destination,
            structure: self.config.organization_mode,
            stats: result.stats,
            archive: result.archive,
            resorted,
            folder_summary: result.folder_summary,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Sort key for a folder relative to the destination: dated folders by
/// (year, month, day, part); the other-files folder and then the no-date
/// folder last.
fn folder_sort_key(relative: &Path, config: &OrganizerConfig) -> (u32, u32, u32, usize) {
    if relative == Path::new(&config.no_date_files_folder) {
        return (9999, 13, 32, 0);
    }
    if relative == Path::new(&config.other_files_folder) {
        return (9999, 13, 31, 0);
    }

    let mut date = [0u32; 3];
    let mut part = 0;
    for (slot, component) in relative.components().take(3).enumerate() {
        match date_part(&component.as_os_str().to_string_lossy()) {
            Some((value, index)) => {
                date[slot] = value;
                part = index;
            }
            None => break,
        }
    }
    (date[0], date[1], date[2], part)
}

/// `<folder relative to dest>: <n> files`, ordered by folder date
fn folder_summary(stats: &RunStats, dest: &Path, config: &OrganizerConfig) -> Vec<String> {
    let mut folders: Vec<(PathBuf, usize)> = stats
        .folder_counts
        .iter()
        .map(|(folder, count)| {
            let relative = folder.strip_prefix(dest).unwrap_or(folder).to_path_buf();
            (relative, *count)
        })
        .collect();
    folders.sort_by(|(a, _), (b, _)| {
        folder_sort_key(a, config)
            .cmp(&folder_sort_key(b, config))
            .then_with(|| a.cmp(b))
    });
    folders
        .into_iter()
        .map(|(folder, count)| format!("{}: {} files", folder.display(), count))
        .collect()
}

fn summary_message(stats: &RunStats, folders: &[String]) -> String {
    let mut lines = vec![
        "Organizing complete".to_string(),
        format!("Files processed: {}", stats.total_processed()),
        format!(
            "Files moved: {}",
            stats.total_processed().saturating_sub(stats.identical_files_removed)
        ),
        format!("Identical files removed: {}", stats.identical_files_removed),
    ];
    if stats.failed_moves > 0 {
        lines.push(format!("Failed moves: {}", stats.failed_moves));
    }
    lines.push(format!("Folders used: {}", folders.len()));
    lines.extend(folders.iter().map(|line| format!("  {}", line)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OrganizationMode;
    use crate::events::{null_sender, EventChannel};
    use chrono::NaiveDateTime;
    use std::sync::OnceLock;
    use tempfile::TempDir;

    /// Metadata provider that knows nothing
    struct NoMetadata;

    impl MetadataProvider for NoMetadata {
        fn image_date(&self, _path: &Path) -> Option<NaiveDateTime> {
            None
        }

        fn video_date(&self, _path: &Path) -> Option<NaiveDateTime> {
            None
        }
    }

    fn engine(config: OrganizerConfig) -> OrganizeEngine {
        OrganizeEngine::with_metadata(config, null_sender(), Arc::new(NoMetadata))
    }

    fn write(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn organizes_by_filename_date() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(src.path(), "IMG_20230704_101500.jpg", b"a");
        write(src.path(), "nested/VID_20230705_090000.mp4", b"bb");
        write(src.path(), "Screenshot_2021-02-03-10-00-00.png", b"ccc");

        let mut engine = engine(OrganizerConfig::default());
        let outcome = engine.organize(src.path(), dest.path(), false).unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.stats.images, 2);
        assert_eq!(report.stats.videos, 1);
        assert!(dest.path().join("2023/2023-07-04 [01].jpg").exists());
        assert!(dest.path().join("2023/2023-07-05 [01].mp4").exists());
        assert!(dest.path().join("2021/2021-02-03 [01].png").exists());
        assert_eq!(engine.phase(), EnginePhase::Done);
    }

    #[test]
    fn empty_source_succeeds_with_zero_counts() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let mut engine = engine(OrganizerConfig::default());
        let outcome = engine.organize(src.path(), dest.path(), false).unwrap();

        assert_eq!(outcome.report().unwrap().stats.total_processed(), 0);
    }

    #[test]
    fn missing_source_is_phase_error() {
        let temp = TempDir::new().unwrap();
        let (tx, rx) = EventChannel::new();
        let mut engine =
            OrganizeEngine::with_metadata(OrganizerConfig::default(), tx, Arc::new(NoMetadata));

        let result = engine.organize(&temp.path().join("missing"), temp.path(), false);

        assert!(matches!(result, Err(OrganizerError::Phase { .. })));
        let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv()).collect();
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::Error { .. })).count(),
            1
        );
    }

    /// Requests termination the first time a date is read
    struct TerminateOnRead(Arc<OnceLock<Arc<RunControl>>>);

    impl MetadataProvider for TerminateOnRead {
        fn image_date(&self, _path: &Path) -> Option<NaiveDateTime> {
            if let Some(control) = self.0.get() {
                control.terminate();
            }
            None
        }

        fn video_date(&self, _path: &Path) -> Option<NaiveDateTime> {
            None
        }
    }

    #[test]
    fn terminate_stops_run_and_allows_rollback() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let first = write(src.path(), "IMG_20200101_000000.jpg", b"a");
        let second = write(src.path(), "IMG_20200102_000000.jpg", b"b");

        let slot = Arc::new(OnceLock::new());
        let mut engine = OrganizeEngine::with_metadata(
            OrganizerConfig::default(),
            null_sender(),
            Arc::new(TerminateOnRead(Arc::clone(&slot))),
        );
        let _ = slot.set(engine.control());

        let outcome = engine.organize(src.path(), dest.path(), false).unwrap();
        assert!(outcome.is_terminated());
        assert_eq!(engine.phase(), EnginePhase::Terminated);

        let report = engine.rollback(dest.path()).unwrap();
        assert_eq!(report.failed, 0);
        assert!(first.exists());
        assert!(second.exists());
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
        assert_eq!(engine.phase(), EnginePhase::Init);
    }

    #[test]
    fn rollback_requires_terminated_run() {
        let dest = TempDir::new().unwrap();
        let mut engine = engine(OrganizerConfig::default());
        assert!(engine.rollback(dest.path()).is_err());
    }

    #[test]
    fn full_run_renumbers_and_reports_folders() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        for i in 0..3 {
            write(src.path(), &format!("IMG_2022010{}_120000.jpg", i + 1), format!("{}", i).as_bytes());
        }
        write(src.path(), "misc/readme.xyz", b"other");

        let config = OrganizerConfig::default().with_organization_mode(OrganizationMode::Monthly);
        let mut engine = engine(config);
        let outcome = engine
            .run(&RunRequest::new(src.path(), dest.path()))
            .unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.stats.total_processed(), 4);
        assert_eq!(report.folder_summary.len(), 2);
        assert!(report.folder_summary[0].starts_with(&format!("2022{}01", std::path::MAIN_SEPARATOR)));
        assert!(report.folder_summary[1].starts_with("Other Files"));
        assert!(dest.path().join("Other Files/readme.xyz").exists());
    }

    #[test]
    fn resort_merges_loose_files_without_dedup() {
        let dest = TempDir::new().unwrap();
        write(dest.path(), "2024[1-2]/2024-01-01 [01].jpg", b"kept one");
        write(dest.path(), "2024[2-2]/2024-02-01 [01].jpg", b"kept two");
        write(dest.path(), "IMG_20240501_100000.jpg", b"same");
        write(dest.path(), "IMG_20240501_100000 copy.jpg", b"same");

        let (tx, rx) = EventChannel::new();
        let mut engine =
            OrganizeEngine::with_metadata(OrganizerConfig::default(), tx, Arc::new(NoMetadata));
        let outcome = engine.resort(dest.path()).unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.stats.images, 2);
        assert_eq!(report.stats.identical_files_removed, 0);
        assert_eq!(report.resorted, 2);

        let mut names: Vec<String> = fs::read_dir(dest.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["2024[1-3]", "2024[2-3]", "2024[3-3]"]);

        assert_eq!(fs::read_dir(dest.path().join("2024[1-3]")).unwrap().count(), 2);
        assert_eq!(
            fs::read(dest.path().join("2024[2-3]/2024-01-01 [01].jpg")).unwrap(),
            b"kept one"
        );
        assert_eq!(
            fs::read(dest.path().join("2024[3-3]/2024-02-01 [01].jpg")).unwrap(),
            b"kept two"
        );

        let percents: Vec<u8> = std::iter::from_fn(|| rx.try_recv())
            .filter_map(|e| match e {
                Event::Progress(update) => update.percent,
                _ => None,
            })
            .collect();
        assert!(!percents.is_empty());
        assert!(percents.iter().all(|p| (70..=100).contains(p)), "{:?}", percents);
    }

    #[test]
    fn sort_key_orders_sinks_last() {
        let config = OrganizerConfig::default();
        let dated = folder_sort_key(Path::new("2024[2-2]"), &config);
        let no_date = folder_sort_key(Path::new("No Date"), &config);
        let other = folder_sort_key(Path::new("Other Files"), &config);

        assert_eq!(dated, (2024, 0, 0, 2));
        assert!(dated < other);
        assert!(other < no_date);
        assert!(folder_sort_key(Path::new("2023/12"), &config) < folder_sort_key(Path::new("2024/01[1-2]"), &config));
    }
}
