//! User settings parsed from `settings.conf`.
//!
//! The file uses the same lenient `key = value` format as the rest of the
//! configuration helpers: unknown keys are ignored and invalid values keep the
//! defaults, so a broken line never prevents a scan.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::util::config::{parse_key_value, skip_comment_or_empty};
use crate::util::parse_bool;

/// Skeleton written on first run so users can discover every key.
pub const SKELETON_SETTINGS_CONTENT: &str = r"# scanmon settings
#
# Lines are `key = value`; `#`, `//` and `;` start comments.

# Scan engine binary and extra arguments appended after `-r --verbose`.
scan_binary = clamscan
# scan_extra_args = --exclude-dir=^/proc

# Signature updater and whether it must be run through sudo.
updater_binary = freshclam
updater_use_sudo = true

# Timeouts in seconds.
scan_timeout_secs = 600
update_timeout_secs = 600

# Signature database directory (defaults to the platform location).
# database_dir = /var/lib/clamav

# Warn when the signature database is older than this many days.
stale_after_days = 7

# Exit code the engine uses to report detections. clamscan uses 1.
# Unset means any non-zero exit is treated as a failed scan.
# infected_exit_code = 1
";

/// User-configurable settings parsed from `settings.conf`.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Scan engine binary (name on `PATH` or absolute path).
    pub scan_binary: String,
    /// Extra arguments placed between `-r --verbose` and the target path.
    pub scan_extra_args: Vec<String>,
    /// Signature updater binary.
    pub updater_binary: String,
    /// Run the updater through `sudo`.
    pub updater_use_sudo: bool,
    /// Per-target scan timeout.
    pub scan_timeout: Duration,
    /// Database update timeout.
    pub update_timeout: Duration,
    /// Override for the signature database directory.
    pub database_dir: Option<PathBuf>,
    /// Age in days after which the database is reported as stale.
    pub stale_after_days: f64,
    /// Exit code that still counts as a completed scan when a summary is present.
    pub infected_exit_code: Option<i32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_binary: "clamscan".to_string(),
            scan_extra_args: Vec::new(),
            updater_binary: "freshclam".to_string(),
            updater_use_sudo: true,
            scan_timeout: Duration::from_secs(600),
            update_timeout: Duration::from_secs(600),
            database_dir: None,
            stale_after_days: 7.0,
            infected_exit_code: None,
        }
    }
}

/// What: Parse positive seconds into a `Duration`.
///
/// Inputs:
/// - `val`: Raw value.
///
/// Output:
/// - `Some(Duration)` for integers greater than zero.
fn parse_positive_secs(val: &str) -> Option<Duration> {
    val.parse::<u64>()
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
}

/// What: Parse settings from configuration text.
///
/// Inputs:
/// - `content`: Full text of a settings file.
///
/// Output:
/// - `Settings` with recognised keys applied over the defaults.
///
/// Details:
/// - Unknown keys are logged at debug level and ignored.
/// - Invalid values are logged at warn level and leave the default in place.
#[must_use]
pub fn parse_settings(content: &str) -> Settings {
    let mut out = Settings::default();
    for line in content.lines() {
        if skip_comment_or_empty(line) {
            continue;
        }
        let Some((key, val)) = parse_key_value(line) else {
            continue;
        };
        let applied = match key.as_str() {
            "scan_binary" | "clamscan" => {
                if val.is_empty() {
                    false
                } else {
                    out.scan_binary = val.clone();
                    true
                }
            }
            "scan_extra_args" => {
                out.scan_extra_args = val.split_whitespace().map(ToString::to_string).collect();
                true
            }
            "updater_binary" | "freshclam" => {
                if val.is_empty() {
                    false
                } else {
                    out.updater_binary = val.clone();
                    true
                }
            }
            "updater_use_sudo" => {
                if let Some(b) = parse_bool(&val) {
                    out.updater_use_sudo = b;
                    true
                } else {
                    false
                }
            }
            "scan_timeout_secs" => {
                if let Some(d) = parse_positive_secs(&val) {
                    out.scan_timeout = d;
                    true
                } else {
                    false
                }
            }
            "update_timeout_secs" => {
                if let Some(d) = parse_positive_secs(&val) {
                    out.update_timeout = d;
                    true
                } else {
                    false
                }
            }
            "database_dir" => {
                out.database_dir = (!val.is_empty()).then(|| PathBuf::from(&val));
                true
            }
            "stale_after_days" => match val.parse::<f64>() {
                Ok(d) if d.is_finite() && d >= 0.0 => {
                    out.stale_after_days = d;
                    true
                }
                _ => false,
            },
            "infected_exit_code" => {
                if val.is_empty() || val.eq_ignore_ascii_case("none") {
                    out.infected_exit_code = None;
                    true
                } else {
                    match val.parse::<i32>() {
                        Ok(c) if c != 0 => {
                            out.infected_exit_code = Some(c);
                            true
                        }
                        _ => false,
                    }
                }
            }
            _ => {
                tracing::debug!(key = %key, "[Settings] ignoring unknown key");
                true
            }
        };
        if !applied {
            tracing::warn!(key = %key, value = %val, "[Settings] invalid value; keeping default");
        }
    }
    out
}

/// What: Load settings from `path`, writing the skeleton when the file is missing.
///
/// Inputs:
/// - `path`: Settings file location.
///
/// Output:
/// - Parsed `Settings`; defaults when the file cannot be read.
///
/// Details:
/// - A missing file is created from [`SKELETON_SETTINGS_CONTENT`] (best effort).
/// - Read failures are logged and never fatal.
#[must_use]
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        if let Some(dir) = path.parent() {
            let _ = fs::create_dir_all(dir);
        }
        match fs::write(path, SKELETON_SETTINGS_CONTENT) {
            Ok(()) => tracing::info!(path = %path.display(), "[Settings] wrote default settings"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "[Settings] could not write default settings");
            }
        }
    }
    match fs::read_to_string(path) {
        Ok(content) => parse_settings(&content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "[Settings] unreadable; using defaults");
            Settings::default()
        }
    }
}
