//! Dates embedded in file names.
//!
//! Patterns are an ordered table; the first pattern that matches AND yields
//! a valid calendar date wins. A match that fails validation (month 13,
//! February 30, year outside 1900-2100) does not stop the search.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

/// Which capture groups hold which date part
#[derive(Debug, Clone, Copy)]
enum Layout {
    /// year, month, day, hour, minute, second
    DateTime,
    /// two-digit year, month, day, hour, minute, second
    ShortYearDateTime,
    /// year, month, day
    Date,
    /// year, month (day = 1)
    YearMonth,
}

struct FilenamePattern {
    name: &'static str,
    regex: Regex,
    layout: Layout,
    /// Index of the first date capture group
    first_group: usize,
}

const PATTERN_TABLE: &[(&str, &str, Layout, usize)] = &[
    (
        "camera prefix",
        r"(?i)(IMG_|VID_|PANO_|MVIMG_)(\d{4})(\d{2})(\d{2})_(\d{2})(\d{2})(\d{2})",
        Layout::DateTime,
        2,
    ),
    (
        "separated date",
        r"(\d{4})[-_]?(\d{2})[-_]?(\d{2})",
        Layout::Date,
        1,
    ),
    (
        "app prefix",
        r"(?i)(Screenshot_|Photo_|Video_|Recording_)(\d{4})(\d{2})(\d{2})",
        Layout::Date,
        2,
    ),
    (
        "compact timestamp",
        r"(\d{4})(\d{2})(\d{2})_(\d{2})(\d{2})(\d{2})",
        Layout::DateTime,
        1,
    ),
    (
        "short-year timestamp",
        r"(?:^|\D)(\d{2})(\d{2})(\d{2})_(\d{2})(\d{2})(\d{2})(?:\D|$)",
        Layout::ShortYearDateTime,
        1,
    ),
    (
        "year-month",
        r"(\d{4})[-_]?(\d{2})(?:\D|$)",
        Layout::YearMonth,
        1,
    ),
];

fn patterns() -> &'static [FilenamePattern] {
    static PATTERNS: OnceLock<Vec<FilenamePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PATTERN_TABLE
            .iter()
            .filter_map(|(name, source, layout, first_group)| {
                Regex::new(source).ok().map(|regex| FilenamePattern {
                    name: *name,
                    regex,
                    layout: *layout,
                    first_group: *first_group,
                })
            })
            .collect()
    })
}

/// Date from the file name (without directory), if any pattern yields a valid one
pub fn date_from_filename(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_name()?.to_str()?;
    parse_filename_date(name)
}

/// Run the pattern table over a bare file name
pub fn parse_filename_date(name: &str) -> Option<NaiveDateTime> {
    patterns().iter().find_map(|pattern| {
        pattern.regex.captures_iter(name).find_map(|caps| {
            let date = extract(&caps, pattern.layout, pattern.first_group);
            if date.is_some() {
                tracing::trace!("'{}' matched {} pattern", name, pattern.name);
            }
            date
        })
    })
}

fn extract(caps: &Captures<'_>, layout: Layout, first: usize) -> Option<NaiveDateTime> {
    let num = |offset: usize| -> Option<u32> { caps.get(first + offset)?.as_str().parse().ok() };

    let (year, month, day) = match layout {
        Layout::ShortYearDateTime => (expand_short_year(num(0)?), num(1)?, num(2)?),
        Layout::YearMonth => (num(0)?, num(1)?, 1),
        Layout::DateTime | Layout::Date => (num(0)?, num(1)?, num(2)?),
    };

    let date = validated_date(year, month, day)?;

    let time = match layout {
        Layout::DateTime | Layout::ShortYearDateTime => {
            NaiveTime::from_hms_opt(num(3)?, num(4)?, num(5)?).unwrap_or(NaiveTime::MIN)
        }
        Layout::Date | Layout::YearMonth => NaiveTime::MIN,
    };

    Some(date.and_time(time))
}

/// Two-digit years: 00-49 -> 20xx, 50-99 -> 19xx
fn expand_short_year(year: u32) -> u32 {
    if year < 50 {
        2000 + year
    } else {
        1900 + year
    }
}

fn validated_date(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1900..=2100).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)
}
