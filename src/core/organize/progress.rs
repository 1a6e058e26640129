//! Progress reporting with overall-percent windows and ETA.

use crate::events::{Event, EventSender, MessageLevel, ProgressUpdate};
use std::time::{Duration, Instant};

/// Maps a pass's local 0..=100 percent into a window of the overall bar
#[derive(Clone)]
pub struct ProgressReporter {
    events: EventSender,
    offset: u8,
    scale: u8,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(events: EventSender, offset: u8, scale: u8) -> Self {
        Self {
            events,
            offset,
            scale,
            started: Instant::now(),
        }
    }

    /// Overall percent for a local percent
    pub fn overall(&self, local: u8) -> u8 {
        let local = u32::from(local.min(100));
        let mapped = u32::from(self.offset) + local * u32::from(self.scale) / 100;
        mapped.min(100) as u8
    }

    pub fn report(&self, local: u8, level: MessageLevel, message: impl Into<String>) {
        let percent = self.overall(local);
        let mut update = ProgressUpdate::new(Some(percent), level, message);
        update.eta_secs = estimate_remaining(self.started.elapsed(), percent).map(|d| d.as_secs());
        self.events.send(Event::Progress(update));
    }

    /// A message that does not move the bar
    pub fn message(&self, level: MessageLevel, message: impl Into<String>) {
        self.events
            .send(Event::Progress(ProgressUpdate::message(level, message)));
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }
}

/// Remaining time if progress so far continues at the same rate
pub fn estimate_remaining(elapsed: Duration, percent: u8) -> Option<Duration> {
    if percent == 0 || percent >= 100 {
        return None;
    }
    let total = elapsed.as_secs_f64() * 100.0 / f64::from(percent);
    Some(Duration::from_secs_f64((total - elapsed.as_secs_f64()).max(0.0)))
}

/// `1h 2m 3s`, `2m 3s` or `3s`
pub fn format_eta(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
