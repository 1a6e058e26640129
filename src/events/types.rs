//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// All events emitted by the organize engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Percent/message update
    Progress(ProgressUpdate),
    /// The engine moved into a new phase
    PhaseChanged { phase: EnginePhase },
    /// A file was moved to its target
    FileMoved { from: PathBuf, to: PathBuf },
    /// A source file was deleted because an identical copy exists at the target
    DuplicateRemoved { path: PathBuf, kept: PathBuf },
    /// The run is blocked on a pause request
    Paused,
    /// The run continues after a pause
    Resumed,
    /// The run finished normally
    Completed(RunSummary),
    /// The run stopped at a checkpoint because of a terminate request
    Terminated,
    /// Moves of a terminated run were reverted
    RolledBack { restored: usize, failed: usize },
    /// A phase failed; the run stops
    Error { phase: EnginePhase, message: String },
}

/// Severity/kind of a progress message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
    Success,
    Progress,
}

/// A progress report.
///
/// `percent == None` is a message-only update (raw value -1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub percent: Option<u8>,
    pub level: MessageLevel,
    pub message: String,
    /// Estimated seconds remaining, when known
    pub eta_secs: Option<u64>,
}

impl ProgressUpdate {
    pub fn new(percent: Option<u8>, level: MessageLevel, message: impl Into<String>) -> Self {
        Self {
            percent,
            level,
            message: message.into(),
            eta_secs: None,
        }
    }

    /// Message without a percent value
    pub fn message(level: MessageLevel, message: impl Into<String>) -> Self {
        Self::new(None, level, message)
    }

    /// Percent as an integer where -1 means "message only"
    pub fn raw_percent(&self) -> i32 {
        self.percent.map(i32::from).unwrap_or(-1)
    }
}

/// Phases of an organize run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnginePhase {
    Init,
    Backup,
    Scan,
    GroupByDate,
    PlanFolders,
    Move,
    Cleanup,
    Resort,
    Done,
    Terminated,
    Rollback,
}

impl EnginePhase {
    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Phases may be skipped (no backup, empty input) but never revisited,
    /// except that a finished pass may start a resort pass.
    pub fn can_transition_to(self, next: EnginePhase) -> bool {
        use EnginePhase::*;
        match (self, next) {
            (Terminated, Rollback) => true,
            (Rollback, Init) => true,
            (Terminated, _) | (Rollback, _) => false,
            (Init, Terminated) => false,
            (_, Terminated) => true,
            (Done, Init) | (Done, Resort) => true,
            (Resort, Scan) => true,
            (Cleanup, Resort) => true,
            (from, to) => to.ordinal() > from.ordinal() && to.ordinal() <= Done.ordinal(),
        }
    }

    fn ordinal(self) -> u8 {
        match self {
            EnginePhase::Init => 0,
            EnginePhase::Backup => 1,
            EnginePhase::Scan => 2,
            EnginePhase::GroupByDate => 3,
            EnginePhase::PlanFolders => 4,
            EnginePhase::Move => 5,
            EnginePhase::Cleanup => 6,
            EnginePhase::Resort => 7,
            EnginePhase::Done => 8,
            EnginePhase::Terminated => 9,
            EnginePhase::Rollback => 10,
        }
    }
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnginePhase::Init => "Initializing",
            EnginePhase::Backup => "Backing up",
            EnginePhase::Scan => "Scanning",
            EnginePhase::GroupByDate => "Reading dates",
            EnginePhase::PlanFolders => "Planning folders",
            EnginePhase::Move => "Moving files",
            EnginePhase::Cleanup => "Cleaning up",
            EnginePhase::Resort => "Resorting",
            EnginePhase::Done => "Done",
            EnginePhase::Terminated => "Terminated",
            EnginePhase::Rollback => "Rolling back",
        };
        write!(f, "{}", name)
    }
}

/// Counts reported when a run completes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub images: usize,
    pub videos: usize,
    pub documents: usize,
    pub others: usize,
    pub identical_files_removed: usize,
    pub failed_moves: usize,
    pub folders_used: usize,
}

impl RunSummary {
    pub fn total_processed(&self) -> usize {
        self.images + self.videos + self.documents + self.others
    }
}
