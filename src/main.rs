//! # media-organize CLI
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! media-organize organize ~/Camera --dest ~/Pictures/Sorted --backup
//! media-organize classify ~/Camera --workers 4
//! ```

mod cli;

use media_organizer::Result;

fn main() -> Result<()> {
    media_organizer::init_tracing();
    cli::run()
}
