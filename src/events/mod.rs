//! # Events Module
//!
//! Event-driven progress reporting for the organize engine.
//!
//! ## Design
//! The engine emits events through channels, so any front-end (CLI, GUI)
//! can subscribe and display progress without the engine knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Progress(p) => println!("{:>3} {}", p.raw_percent(), p.message),
//!             Event::FileMoved { to, .. } => println!("-> {}", to.display()),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! let outcome = engine.organize(&source, &dest, false)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
