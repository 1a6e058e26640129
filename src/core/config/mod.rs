//! # Config Module
//!
//! Organizer settings: which extensions count as which kind of file, how
//! folders and files are named, the date-source priority and folder capacity.
//!
//! `OrganizerConfig` is a plain value. The engine takes a copy when a run
//! starts, so changing settings mid-run has no effect on that run. The
//! `with_*` setters validate and return a new config.
//!
//! Settings persist as JSON. Missing keys fall back to defaults; a file that
//! cannot be parsed is logged and replaced by the full defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_IMAGE_FORMATS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic", "heif", "raw", "dng",
    "cr2", "nef", "arw",
];

pub const DEFAULT_VIDEO_FORMATS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "wmv", "flv", "m4v", "mpeg", "mpg", "3gp", "webm",
];

pub const DEFAULT_DOCUMENT_FORMATS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "odt", "ods", "odp",
    "csv",
];

/// A set of file extensions, stored lowercase without the leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FormatSet(BTreeSet<String>);

impl FormatSet {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        )
    }

    /// Case-insensitive membership test; accepts "jpg", "JPG" or ".jpg"
    pub fn contains(&self, extension: &str) -> bool {
        normalize_extension(extension)
            .map(|ext| self.0.contains(&ext))
            .unwrap_or(false)
    }

    pub fn union(&self, other: &FormatSet) -> FormatSet {
        FormatSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for FormatSet {
    fn from(extensions: Vec<String>) -> Self {
        FormatSet::new(extensions)
    }
}

impl From<FormatSet> for Vec<String> {
    fn from(set: FormatSet) -> Self {
        set.0.into_iter().collect()
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Date granularity of the folder layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationMode {
    #[default]
    Yearly,
    Monthly,
    Daily,
}

/// Whether a naming template is used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    #[default]
    Default,
    Custom,
}

/// Brackets placed around a sequence number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceWrapper {
    #[default]
    #[serde(rename = "[]")]
    Square,
    #[serde(rename = "()")]
    Round,
    #[serde(rename = "")]
    None,
}

impl SequenceWrapper {
    pub fn wrap(&self, sequence: &str) -> String {
        match self {
            SequenceWrapper::Square => format!("[{}]", sequence),
            SequenceWrapper::Round => format!("({})", sequence),
            SequenceWrapper::None => sequence.to_string(),
        }
    }
}

/// One source of a file's date, tried in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    /// EXIF capture date (images)
    Exif,
    /// Container creation tags (videos)
    Metadata,
    /// Date embedded in the file name
    Filename,
    /// Modification time
    Filetime,
    /// Creation time
    Creationtime,
    /// Access time
    Filesystem,
}

impl DateSource {
    pub fn name(&self) -> &'static str {
        match self {
            DateSource::Exif => "exif",
            DateSource::Metadata => "metadata",
            DateSource::Filename => "filename",
            DateSource::Filetime => "filetime",
            DateSource::Creationtime => "creationtime",
            DateSource::Filesystem => "filesystem",
        }
    }

    pub fn default_priority() -> Vec<DateSource> {
        vec![
            DateSource::Exif,
            DateSource::Metadata,
            DateSource::Filename,
            DateSource::Filetime,
            DateSource::Creationtime,
            DateSource::Filesystem,
        ]
    }
}

/// All user-tunable settings of the organizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    pub image_formats: FormatSet,
    pub video_formats: FormatSet,
    pub document_formats: FormatSet,
    /// Extensions explicitly treated as "other"; unknown extensions are other too
    pub other_formats: FormatSet,
    pub organization_mode: OrganizationMode,
    pub folder_naming_mode: NamingMode,
    pub file_naming_mode: NamingMode,
    /// File template, tokens: {date} {year} {month} {day} {sequence}
    /// {wrapped_sequence} {separator}
    pub naming_pattern: String,
    /// Folder template, tokens: {year} {month} {day} {date} {index} {total}
    /// {separator}
    pub folder_naming_pattern: String,
    pub sequence_wrapper: SequenceWrapper,
    pub folder_separator: String,
    pub file_separator: String,
    pub date_priority_list: Vec<DateSource>,
    pub rename_no_date_files: bool,
    pub organize_other_files: bool,
    pub other_files_folder: String,
    pub no_date_files_folder: String,
    /// Files per folder; 0 means unlimited
    pub max_files_per_folder: u32,
    /// Directories whose name contains this are never scanned
    pub backup_folder_name: String,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            image_formats: FormatSet::new(DEFAULT_IMAGE_FORMATS),
            video_formats: FormatSet::new(DEFAULT_VIDEO_FORMATS),
            document_formats: FormatSet::new(DEFAULT_DOCUMENT_FORMATS),
            other_formats: FormatSet::default(),
            organization_mode: OrganizationMode::Yearly,
            folder_naming_mode: NamingMode::Default,
            file_naming_mode: NamingMode::Default,
            naming_pattern: "{date}{separator}{sequence}".to_string(),
            folder_naming_pattern: "{year}-{index}".to_string(),
            sequence_wrapper: SequenceWrapper::Square,
            folder_separator: "-".to_string(),
            file_separator: String::new(),
            date_priority_list: DateSource::default_priority(),
            rename_no_date_files: true,
            organize_other_files: true,
            other_files_folder: "Other Files".to_string(),
            no_date_files_folder: "No Date".to_string(),
            max_files_per_folder: 100,
            backup_folder_name: "BACKUP".to_string(),
        }
    }
}

impl OrganizerConfig {
    /// Default settings file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("media-organizer")
            .join("settings.json")
    }

    /// Load settings, falling back to defaults for a missing or unreadable file.
    pub fn load(path: &Path) -> OrganizerConfig {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return OrganizerConfig::default();
            }
            Err(e) => {
                warn!("Failed to read settings {}: {}", path.display(), e);
                return OrganizerConfig::default();
            }
        };

        match serde_json::from_str::<OrganizerConfig>(&contents) {
            Ok(config) => match config.validate() {
                Ok(()) => config,
                Err(e) => {
                    warn!("Invalid settings in {}: {}; using defaults", path.display(), e);
                    OrganizerConfig::default()
                }
            },
            Err(e) => {
                warn!("Malformed settings in {}: {}; using defaults", path.display(), e);
                OrganizerConfig::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every invariant a loaded or edited config must hold
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_capacity(self.max_files_per_folder)?;
        validate_priority(&self.date_priority_list)?;
        validate_folder_name(&self.other_files_folder)?;
        validate_folder_name(&self.no_date_files_folder)?;
        validate_folder_name(&self.backup_folder_name)?;
        Ok(())
    }

    pub fn with_capacity(mut self, capacity: u32) -> Result<Self, ConfigError> {
        validate_capacity(capacity)?;
        self.max_files_per_folder = capacity;
        Ok(self)
    }

    pub fn with_priority(mut self, priority: Vec<DateSource>) -> Result<Self, ConfigError> {
        validate_priority(&priority)?;
        self.date_priority_list = priority;
        Ok(self)
    }

    pub fn with_organization_mode(mut self, mode: OrganizationMode) -> Self {
        self.organization_mode = mode;
        self
    }

    /// Custom image/video/document extensions are added to the defaults;
    /// `other` replaces the explicit other-formats set.
    pub fn with_formats(
        mut self,
        images: FormatSet,
        videos: FormatSet,
        documents: FormatSet,
        other: FormatSet,
    ) -> Self {
        self.image_formats = FormatSet::new(DEFAULT_IMAGE_FORMATS).union(&images);
        self.video_formats = FormatSet::new(DEFAULT_VIDEO_FORMATS).union(&videos);
        self.document_formats = FormatSet::new(DEFAULT_DOCUMENT_FORMATS).union(&documents);
        self.other_formats = other;
        self
    }

    pub fn with_folder_names(
        mut self,
        no_date: &str,
        other: &str,
    ) -> Result<Self, ConfigError> {
        validate_folder_name(no_date)?;
        validate_folder_name(other)?;
        self.no_date_files_folder = no_date.to_string();
        self.other_files_folder = other.to_string();
        Ok(self)
    }

    pub fn with_folder_naming(mut self, mode: NamingMode, pattern: &str, separator: &str) -> Self {
        self.folder_naming_mode = mode;
        self.folder_naming_pattern = pattern.to_string();
        self.folder_separator = separator.to_string();
        self
    }

    pub fn with_file_naming(
        mut self,
        mode: NamingMode,
        pattern: &str,
        separator: &str,
        wrapper: SequenceWrapper,
    ) -> Self {
        self.file_naming_mode = mode;
        self.naming_pattern = pattern.to_string();
        self.file_separator = separator.to_string();
        self.sequence_wrapper = wrapper;
        self
    }

    pub fn with_other_files(mut self, organize: bool) -> Self {
        self.organize_other_files = organize;
        self
    }

    pub fn with_rename_no_date(mut self, rename: bool) -> Self {
        self.rename_no_date_files = rename;
        self
    }

    pub fn with_backup_folder_name(mut self, name: &str) -> Result<Self, ConfigError> {
        validate_folder_name(name)?;
        self.backup_folder_name = name.to_string();
        Ok(self)
    }
}

fn validate_capacity(capacity: u32) -> Result<(), ConfigError> {
    if capacity % 100 != 0 {
        return Err(ConfigError::InvalidCapacity { value: capacity });
    }
    Ok(())
}

fn validate_priority(priority: &[DateSource]) -> Result<(), ConfigError> {
    if priority.is_empty() {
        return Err(ConfigError::EmptyPriorityList);
    }
    let mut seen = BTreeSet::new();
    for source in priority {
        if !seen.insert(*source) {
            return Err(ConfigError::DuplicateDateSource {
                name: source.name().to_string(),
            });
        }
    }
    Ok(())
}

fn validate_folder_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed == "."
        || trimmed == ".."
    {
        return Err(ConfigError::InvalidFolderName {
            name: name.to_string(),
        });
    }
    Ok(())
}
