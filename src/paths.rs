//! Filesystem locations owned by scanmon itself (settings and logs).

use std::env;
use std::path::{Path, PathBuf};

/// Directory name used under the XDG/HOME config base.
const APP_DIR: &str = "scanmon";

/// Resolve an XDG base directory from environment or default to `$HOME` + segments.
///
/// Inputs:
/// - `var`: Environment variable to check (e.g., `XDG_CONFIG_HOME`).
/// - `home_default`: Fallback path segments relative to `$HOME` if `var` is unset/empty.
///
/// Output: Resolved base directory path.
fn xdg_base_dir(var: &str, home_default: &[&str]) -> PathBuf {
    if let Ok(p) = env::var(var)
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    let mut base = home_dir().unwrap_or_else(|| PathBuf::from("."));
    for seg in home_default {
        base = base.join(seg);
    }
    base
}

/// What: Current user's home directory from `$HOME`.
///
/// Output:
/// - `Some(PathBuf)` when `HOME` is set and non-empty, `None` otherwise.
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// XDG config directory for scanmon: `$XDG_CONFIG_HOME/scanmon` or `~/.config/scanmon`.
///
/// The directory is created if missing; creation failures are ignored here and
/// surface later when a file inside it is opened.
#[must_use]
pub fn config_dir() -> PathBuf {
    let dir = xdg_base_dir("XDG_CONFIG_HOME", &[".config"]).join(APP_DIR);
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// Logs directory under config: `~/.config/scanmon/logs` (ensured to exist).
#[must_use]
pub fn logs_dir() -> PathBuf {
    logs_dir_in(&config_dir())
}

/// What: Logs directory below an explicit config directory.
///
/// Inputs:
/// - `base`: Config directory to nest `logs/` in.
///
/// Output:
/// - `base/logs`, created when possible.
#[must_use]
pub fn logs_dir_in(base: &Path) -> PathBuf {
    let dir = base.join("logs");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// Default settings file: `~/.config/scanmon/settings.conf`.
#[must_use]
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.conf")
}
