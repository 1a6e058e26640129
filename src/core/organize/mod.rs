//! Organization runs.
//!
//! Groups scanned files by date, plans capacity-limited folders, moves files
//! with duplicate removal and keeps an undo log so a terminated run can be
//! rolled back.

mod control;
mod engine;
mod executor;
mod handle;
mod naming;
mod planner;
mod progress;
mod renumber;
mod rollback;
mod types;

pub use control::{PauseNotice, RunControl, Terminated, PAUSE_NOTICE_INTERVAL};
pub use engine::OrganizeEngine;
pub use executor::{MoveContext, MoveExecutor, MoveOutcome};
pub use handle::EngineHandle;
pub use naming::{dated_folder, default_dated_folder, file_base_name, render, sequence_width};
pub use planner::{FolderAssignment, FolderPlan, FolderPlanner, PlannedFolder, PlannedMove};
pub use progress::{estimate_remaining, format_eta, ProgressReporter};
pub use renumber::{RenumberReport, Renumberer};
pub use rollback::{ReplayResult, RollbackEntry, RollbackLog};
pub use types::*;
