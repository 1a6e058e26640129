//! Folder and file naming.
//!
//! Default layout: `<dest>/YYYY[/MM[/DD]]`, with the leaf suffixed
//! `[i-total]` when a date key needs more than one folder. Default file
//! names: `YYYY-MM-DD <wrapped sequence>`.
//!
//! Custom templates use `{token}` placeholders. A template that does not
//! render (unknown token, token finer than the folder granularity, missing
//! `{index}` or sequence token, a folder name that leaves the destination)
//! is reported and the default name is used.

use super::types::DateKey;
use crate::core::config::{NamingMode, OrganizerConfig};
use crate::error::NamingError;
use chrono::NaiveDateTime;
use std::path::{Component, Path, PathBuf};

/// Zero-padding width for a sequence whose largest number is `total`
pub fn sequence_width(total: usize) -> usize {
    match total {
        0..=99 => 2,
        100..=999 => 3,
        1000..=9999 => 4,
        _ => 5,
    }
}

/// Replace `{token}` placeholders. Every token must be in `values`.
pub fn render(template: &str, values: &[(&str, &str)]) -> Result<String, NamingError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        if rest.as_bytes()[open] == b'}' {
            return Err(NamingError::UnbalancedBraces {
                template: template.to_string(),
            });
        }
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| NamingError::UnbalancedBraces {
            template: template.to_string(),
        })?;
        let token = &after[..close];
        if token.contains('{') {
            return Err(NamingError::UnbalancedBraces {
                template: template.to_string(),
            });
        }
        let value = values
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, value)| *value)
            .ok_or_else(|| NamingError::UnknownToken {
                token: token.to_string(),
                template: template.to_string(),
            })?;
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Whether `template` contains `{token}`
fn uses_token(template: &str, token: &str) -> bool {
    template.contains(&format!("{{{}}}", token))
}

/// Folder for part `index` (1-based) of `total` parts of a dated key
pub fn dated_folder(
    dest: &Path,
    key: &DateKey,
    index: usize,
    total: usize,
    config: &OrganizerConfig,
) -> Result<PathBuf, NamingError> {
    match config.folder_naming_mode {
        NamingMode::Default => Ok(default_dated_folder(dest, key, index, total)),
        NamingMode::Custom => custom_dated_folder(dest, key, index, total, config),
    }
}

/// `<dest>/YYYY[/MM[/DD]]` with `[i-total]` on the leaf when split
pub fn default_dated_folder(dest: &Path, key: &DateKey, index: usize, total: usize) -> PathBuf {
    let parts = key.parts();
    let mut path = dest.to_path_buf();
    for (position, part) in parts.iter().enumerate() {
        let is_leaf = position + 1 == parts.len();
        if is_leaf && total > 1 {
            path.push(format!("{}[{}-{}]", part, index, total));
        } else {
            path.push(part);
        }
    }
    path
}

fn custom_dated_folder(
    dest: &Path,
    key: &DateKey,
    index: usize,
    total: usize,
    config: &OrganizerConfig,
) -> Result<PathBuf, NamingError> {
    let template = config.folder_naming_pattern.as_str();
    if total > 1 && !uses_token(template, "index") {
        return Err(NamingError::MissingToken {
            token: "index".to_string(),
            template: template.to_string(),
        });
    }

    let parts = key.parts();
    let index = index.to_string();
    let total = total.to_string();
    let mut values: Vec<(&str, &str)> = vec![
        ("date", key.as_str()),
        ("index", index.as_str()),
        ("total", total.as_str()),
        ("separator", config.folder_separator.as_str()),
    ];
    for (token, part) in ["year", "month", "day"].into_iter().zip(parts.iter()) {
        values.push((token, *part));
    }

    let name = collapse(&render(template, &values)?, &config.folder_separator);
    if name.is_empty() {
        return Err(NamingError::EmptyName {
            template: template.to_string(),
        });
    }
    let relative = Path::new(&name);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(NamingError::OutsideDestination {
            template: template.to_string(),
            name,
        });
    }
    Ok(dest.join(relative))
}

/// Base name (no extension) for the `sequence`-th file of a (key, kind)
/// series of `series_len` files. `date` is `None` for no-date files.
pub fn file_base_name(
    date: Option<NaiveDateTime>,
    sequence: usize,
    series_len: usize,
    config: &OrganizerConfig,
) -> Result<String, NamingError> {
    let width = sequence_width(series_len);
    let sequence = format!("{:0width$}", sequence, width = width);
    let wrapped = config.sequence_wrapper.wrap(&sequence);
    let date_label = date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| config.no_date_files_folder.clone());

    match config.file_naming_mode {
        NamingMode::Default => Ok(format!("{} {}", date_label, wrapped)),
        NamingMode::Custom => {
            let template = config.naming_pattern.as_str();
            if !uses_token(template, "sequence") && !uses_token(template, "wrapped_sequence") {
                return Err(NamingError::MissingToken {
                    token: "sequence".to_string(),
                    template: template.to_string(),
                });
            }
            let (year, month, day) = match date {
                Some(d) => (
                    d.format("%Y").to_string(),
                    d.format("%m").to_string(),
                    d.format("%d").to_string(),
                ),
                None => Default::default(),
            };
            let values = [
                ("date", date_label.as_str()),
                ("year", year.as_str()),
                ("month", month.as_str()),
                ("day", day.as_str()),
                ("sequence", sequence.as_str()),
                ("wrapped_sequence", wrapped.as_str()),
                ("separator", config.file_separator.as_str()),
            ];
            let name = collapse(&render(template, &values)?, &config.file_separator);
            if name.is_empty() {
                return Err(NamingError::EmptyName {
                    template: template.to_string(),
                });
            }
            Ok(name)
        }
    }
}

/// Collapse runs of whitespace and trim whitespace and `separator` from the ends
fn collapse(name: &str, separator: &str) -> String {
    let mut collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if !separator.is_empty() {
        while collapsed.starts_with(separator) {
            collapsed = collapsed[separator.len()..].trim_start().to_string();
        }
        while collapsed.ends_with(separator) {
            collapsed.truncate(collapsed.len() - separator.len());
            collapsed = collapsed.trim_end().to_string();
        }
    }
    collapsed
}
