//! # Core Module
//!
//! The UI-agnostic organizing engine.
//!
//! ## Modules
//! - `config` - User settings and their JSON file
//! - `scanner` - Finds and classifies files
//! - `metadata` - Embedded EXIF and video dates
//! - `dates` - Date resolution with prioritized sources
//! - `hasher` - Content digests
//! - `dedup` - Identical-file detection
//! - `fileops` - Safe moves, unique names, empty-directory cleanup
//! - `backup` - Zip snapshot of the source before a run
//! - `organize` - Planning, moving, rollback and the engine itself

pub mod backup;
pub mod config;
pub mod dates;
pub mod dedup;
pub mod fileops;
pub mod hasher;
pub mod metadata;
pub mod organize;
pub mod scanner;

// Re-export commonly used types
pub use backup::{BackupArchiver, BackupOutcome};
pub use config::{DateSource, OrganizationMode, OrganizerConfig};
pub use dates::DateResolver;
pub use dedup::Deduplicator;
pub use metadata::{MetadataProvider, SystemMetadata};
pub use organize::{EngineHandle, OrganizeEngine, RunOutcome, RunReport, RunRequest};
pub use scanner::{ClassifiedFiles, DirectoryScanner, FileKind, ScanConfig};
