//! Runs an engine on its own worker thread.

use super::control::RunControl;
use super::engine::OrganizeEngine;
use super::types::{RunOutcome, RunRequest};
use crate::error::{OrganizerError, Result};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Caller-side handle of a run in progress.
///
/// Pause, resume and terminate only flip flags; the worker acts on them at
/// its next checkpoint.
pub struct EngineHandle {
    control: Arc<RunControl>,
    worker: JoinHandle<(OrganizeEngine, Result<RunOutcome>)>,
}

impl EngineHandle {
    /// Start `engine.run(request)` on a new thread
    pub fn spawn(mut engine: OrganizeEngine, request: RunRequest) -> Result<Self> {
        let control = engine.control();
        let worker = thread::Builder::new()
            .name("organize-engine".to_string())
            .spawn(move || {
                let outcome = engine.run(&request);
                (engine, outcome)
            })
            .map_err(|e| OrganizerError::Phase {
                phase: "Start".to_string(),
                message: format!("failed to start engine thread: {}", e),
            })?;

        Ok(Self { control, worker })
    }

    /// Shared control flags, for callers that outlive the handle
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn terminate(&self) {
        self.control.terminate();
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the run and take back the engine
    pub fn join(self) -> (Option<OrganizeEngine>, Result<RunOutcome>) {
        match self.worker.join() {
            Ok((engine, outcome)) => (Some(engine), outcome),
            Err(_) => (
                None,
                Err(OrganizerError::Phase {
                    phase: "Run".to_string(),
                    message: "engine thread panicked".to_string(),
                }),
            ),
        }
    }

    /// Wait for the run, discarding the engine
    pub fn wait(self) -> Result<RunOutcome> {
        self.join().1
    }
}
