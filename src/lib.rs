//! # Media Organizer
//!
//! Sorts large photo, video and document collections into dated folders.
//!
//! ## Core Philosophy
//! - **Undoable** - Every move is logged; a terminated run rolls back
//! - **No silent loss** - Only byte-identical copies are ever deleted
//! - **Interruptible** - Pause, resume and terminate between files
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Scanning, dating, planning, moving and rollback
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OrganizerError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Calling it twice
/// keeps the first subscriber.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
