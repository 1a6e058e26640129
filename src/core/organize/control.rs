//! Pause / resume / terminate flags shared between the engine thread and
//! whoever drives it.

use super::progress::ProgressReporter;
use crate::events::{Event, MessageLevel};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// How often a paused engine reports that it is still waiting
pub const PAUSE_NOTICE_INTERVAL: Duration = Duration::from_secs(5);

/// Returned by [`RunControl::checkpoint`] once termination was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminated;

/// Reported to the checkpoint caller while paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseNotice {
    /// Still paused; `first` is true the first time
    Waiting { first: bool },
    Resumed,
}

#[derive(Debug, Default)]
struct ControlState {
    paused: bool,
    terminated: bool,
}

/// Cooperative run control.
///
/// The engine calls [`checkpoint`](Self::checkpoint) between files. While
/// paused it blocks there; terminate wakes it immediately.
#[derive(Debug, Default)]
pub struct RunControl {
    state: Mutex<ControlState>,
    wake: Condvar,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn pause(&self) {
        self.lock().paused = true;
    }

    pub fn resume(&self) {
        self.lock().paused = false;
        self.wake.notify_all();
    }

    /// Request termination. Also releases a paused engine.
    pub fn terminate(&self) {
        let mut state = self.lock();
        state.terminated = true;
        state.paused = false;
        drop(state);
        self.wake.notify_all();
    }

    /// Clear both flags before a new run
    pub fn reset(&self) {
        let mut state = self.lock();
        state.terminated = false;
        state.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    /// Block while paused, then report whether the run may continue.
    ///
    /// `notify` is never called with the lock held.
    pub fn checkpoint<F>(&self, mut notify: F) -> Result<(), Terminated>
    where
        F: FnMut(PauseNotice),
    {
        let mut state = self.lock();
        if state.terminated {
            return Err(Terminated);
        }
        if !state.paused {
            return Ok(());
        }

        let mut first = true;
        loop {
            drop(state);
            notify(PauseNotice::Waiting { first });
            first = false;

            state = self.lock();
            let (guard, _) = self
                .wake
                .wait_timeout_while(state, PAUSE_NOTICE_INTERVAL, |s| s.paused && !s.terminated)
                .unwrap_or_else(|p| p.into_inner());
            state = guard;

            if state.terminated {
                return Err(Terminated);
            }
            if !state.paused {
                drop(state);
                notify(PauseNotice::Resumed);
                return Ok(());
            }
        }
    }

    /// [`checkpoint`](Self::checkpoint) that reports pauses as events
    pub fn checkpoint_with(&self, progress: &ProgressReporter) -> Result<(), Terminated> {
        self.checkpoint(|notice| match notice {
            PauseNotice::Waiting { first } => {
                if first {
                    progress.events().send(Event::Paused);
                }
                progress.message(MessageLevel::Info, "Paused, waiting to resume...");
            }
            PauseNotice::Resumed => {
                progress.events().send(Event::Resumed);
                progress.message(MessageLevel::Info, "Resumed");
            }
        })
    }
}
