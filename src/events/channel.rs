//! Event channel built on crossbeam-channel.
//!
//! The engine runs on a worker thread and owns an `EventSender`; the
//! front-end drains the matching `EventReceiver` on its own thread.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::time::Duration;

use super::Event;

/// Sending half held by the engine. Cheap to clone.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Send an event.
    ///
    /// Blocks only on a full bounded channel. A dropped receiver is not an
    /// error: the run continues without anyone watching.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half held by the front-end.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event; `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Wait at most `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        self.inner.recv_timeout(timeout).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel; the engine never waits on the front-end.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }

    /// Bounded channel. With capacity 0 every send is a rendezvous, which
    /// lets a caller act between two engine steps.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        EventChannel
    }
}

/// Sender whose events go nowhere, for headless runs and tests.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
