//! # Metadata Module
//!
//! Embedded capture dates.
//!
//! ## Sources
//! - Images: EXIF `DateTimeOriginal`, then `DateTime`, then `DateTimeDigitized`
//! - Videos: container tags reported by `ffprobe` (`creation_time`, `date`,
//!   `time`, `DATE`)
//!
//! Both are reached through the [`MetadataProvider`] trait so the date
//! resolver can be tested without real media files or an ffprobe binary.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use serde_json::Value as JsonValue;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Extensions whose files may carry EXIF
pub const EXIF_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "tif", "tiff", "png", "heic", "dng", "raw", "cr2", "nef", "arw",
];

/// Extensions probed for container dates
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "wmv", "flv", "m4v", "mpeg", "mpg", "3gp", "webm",
];

const EXIF_DATE_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y%m%d %H%M%S",
];

const EXIF_DAY_FORMATS: &[&str] = &["%Y:%m:%d", "%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

const VIDEO_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y%m%d %H%M%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S",
];

const VIDEO_DAY_FORMATS: &[&str] = &["%Y-%m-%d"];

const VIDEO_DATE_TAGS: &[&str] = &["creation_time", "date", "time", "DATE"];

const LENIENT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
    "%b %d %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

const LENIENT_DAY_FORMATS: &[&str] = &[
    "%d.%m.%Y", "%d/%m/%Y", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y",
    "%Y.%m.%d",
];

/// Source of embedded dates
pub trait MetadataProvider: Send + Sync {
    /// Capture date from image metadata
    fn image_date(&self, path: &Path) -> Option<NaiveDateTime>;

    /// Creation date from video container metadata
    fn video_date(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Reads EXIF with kamadak-exif and video tags with `ffprobe`
#[derive(Debug, Clone)]
pub struct SystemMetadata {
    ffprobe: String,
}

impl SystemMetadata {
    pub fn new() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
        }
    }

    /// Use a specific ffprobe binary
    pub fn with_ffprobe(mut self, program: impl Into<String>) -> Self {
        self.ffprobe = program.into();
        self
    }
}

impl Default for SystemMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProvider for SystemMetadata {
    fn image_date(&self, path: &Path) -> Option<NaiveDateTime> {
        read_exif_date(path)
    }

    fn video_date(&self, path: &Path) -> Option<NaiveDateTime> {
        let output = match Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                debug!("ffprobe unavailable for {}: {}", path.display(), e);
                return None;
            }
        };

        if !output.status.success() {
            debug!("ffprobe failed on {}", path.display());
            return None;
        }

        let json: JsonValue = serde_json::from_slice(&output.stdout).ok()?;
        video_date_from_probe(&json)
    }
}

/// Whether the extension may carry EXIF
pub fn is_exif_capable(path: &Path) -> bool {
    has_extension_in(path, EXIF_EXTENSIONS)
}

/// Whether the extension is a probed video container
pub fn is_video_container(path: &Path) -> bool {
    has_extension_in(path, VIDEO_EXTENSIONS)
}

fn has_extension_in(path: &Path, list: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| list.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read the EXIF capture date
pub fn read_exif_date(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(&file);
    let exif = match Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No EXIF in {}: {}", path.display(), e);
            return None;
        }
    };

    for tag in [Tag::DateTimeOriginal, Tag::DateTime, Tag::DateTimeDigitized] {
        let Some(field) = exif.get_field(tag, In::PRIMARY) else {
            continue;
        };
        if let Value::Ascii(ref values) = field.value {
            let parsed = values
                .first()
                .and_then(|bytes| std::str::from_utf8(bytes).ok())
                .and_then(parse_exif_datetime);
            if parsed.is_some() {
                return parsed;
            }
        }
    }

    None
}

/// Parse an EXIF date string, ignoring fractional seconds
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = strip_fraction(raw.trim().trim_end_matches('\0'));
    parse_with(&cleaned, EXIF_DATE_FORMATS, EXIF_DAY_FORMATS).or_else(|| parse_lenient(&cleaned))
}

/// Extract the first usable date tag from ffprobe `-show_format` JSON
pub fn video_date_from_probe(json: &JsonValue) -> Option<NaiveDateTime> {
    let tags = json.get("format")?.get("tags")?;
    VIDEO_DATE_TAGS
        .iter()
        .filter_map(|tag| tags.get(*tag).and_then(|v| v.as_str()))
        .find_map(parse_video_datetime)
}

/// Parse a container date. Values carrying a zone are converted to local time.
pub fn parse_video_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.ends_with('Z') || raw.contains('+') {
        if let Some(local) = parse_zoned(raw) {
            return Some(local);
        }
    }

    let cleaned = strip_fraction(raw).replace('T', " ");
    let cleaned = cleaned.trim_end_matches('Z');
    parse_with(cleaned, VIDEO_DATE_FORMATS, VIDEO_DAY_FORMATS).or_else(|| parse_lenient(cleaned))
}

/// Best-effort parse of free-form date text
pub fn parse_lenient(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(local) = parse_zoned(raw) {
        return Some(local);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    parse_with(raw, LENIENT_DATETIME_FORMATS, LENIENT_DAY_FORMATS)
}

fn parse_zoned(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.replacen(' ', "T", 1);
    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

fn parse_with(raw: &str, datetime_formats: &[&str], day_formats: &[&str]) -> Option<NaiveDateTime> {
    datetime_formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            day_formats
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Drop a trailing `.<digits>` fraction (e.g. "10:20:30.123" -> "10:20:30")
fn strip_fraction(raw: &str) -> String {
    if let Some(idx) = raw.rfind('.') {
        let tail = &raw[idx + 1..];
        let head = &raw[..idx];
        if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) && head.contains(':') {
            return head.to_string();
        }
    }
    raw.to_string()
}
