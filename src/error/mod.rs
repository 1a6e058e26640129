//! # Error Module
//!
//! Error types for the media organizer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file problems are not fatal** - the engine logs them and moves on;
//!   only phase-level failures surface as `OrganizerError`

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),

    #[error("Move error: {0}")]
    Move(#[from] MoveError),

    #[error("{phase} failed: {message}")]
    Phase { phase: String, message: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while walking and classifying a directory tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start classification workers: {0}")]
    WorkerPool(String),
}

/// Errors that occur while writing the backup archive
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to create backup archive {path}: {source}")]
    CreateArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to add {path} to the backup archive: {source}")]
    AddFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup archive {path} is corrupt: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Errors in settings values or the settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid folder capacity {value}: must be 0 (unlimited) or a multiple of 100")]
    InvalidCapacity { value: u32 },

    #[error("Date priority list must contain at least one source")]
    EmptyPriorityList,

    #[error("Date source '{name}' appears more than once in the priority list")]
    DuplicateDateSource { name: String },

    #[error("Invalid folder name '{name}': must be non-empty and contain no path separators")]
    InvalidFolderName { name: String },

    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors in a folder or file naming template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("Unknown token '{{{token}}}' in template '{template}'")]
    UnknownToken { token: String, template: String },

    #[error("Unbalanced braces in template '{template}'")]
    UnbalancedBraces { template: String },

    #[error("Template '{template}' must contain {{{token}}}")]
    MissingToken { token: String, template: String },

    #[error("Template '{template}' renders to an empty name")]
    EmptyName { template: String },

    #[error("Template '{template}' renders to '{name}', which leaves the destination")]
    OutsideDestination { template: String, name: String },

    #[error("Template '{template}' gives {folder} to more than one date")]
    SharedFolder { template: String, folder: PathBuf },
}

/// Errors that occur while moving a single file
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Source file not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Transfer {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {to}: expected {expected} bytes, found {actual}")]
    Verification {
        to: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;
