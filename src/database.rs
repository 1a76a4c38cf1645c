//! Signature database inspection: location, age, staleness and `sigtool` info.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use tokio::process::Command;

/// Signature files in lookup order.
pub const SIGNATURE_FILES: [&str; 4] = ["main.cvd", "main.cld", "daily.cvd", "daily.cld"];

/// Seconds per day for fractional age.
const SECS_PER_DAY: f64 = 86_400.0;

/// Time limit for the best-effort `sigtool --info` call.
const SIGTOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// What: Modification time and age of one signature file.
#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseStatus {
    /// Signature file inspected.
    pub path: PathBuf,
    /// Last modification time.
    pub modified: SystemTime,
    /// Age in fractional days at inspection time.
    pub age_days: f64,
}

impl DatabaseStatus {
    /// Whether the database is older than `threshold_days`.
    #[must_use]
    pub fn is_stale(&self, threshold_days: f64) -> bool {
        is_stale(self.age_days, threshold_days)
    }

    /// Modification time as local `YYYY-MM-DD HH:MM`.
    #[must_use]
    pub fn modified_display(&self) -> String {
        let dt: DateTime<Local> = self.modified.into();
        dt.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// What: Fractional days between `modified` and `now`.
///
/// Output:
/// - Zero when `modified` lies in the future (clock skew).
#[must_use]
pub fn age_days(modified: SystemTime, now: SystemTime) -> f64 {
    now.duration_since(modified)
        .map_or(0.0, |d| d.as_secs_f64() / SECS_PER_DAY)
}

/// Whether an age in days exceeds the staleness threshold.
#[must_use]
pub fn is_stale(age_days: f64, threshold_days: f64) -> bool {
    age_days > threshold_days
}

/// What: Inspect a signature file's modification time.
///
/// Inputs:
/// - `path`: Signature file.
///
/// Output:
/// - [`DatabaseStatus`] or the I/O error from `stat`.
///
/// # Errors
/// - Returns `Err` when the file cannot be inspected.
pub fn database_status(path: &Path) -> io::Result<DatabaseStatus> {
    let modified = std::fs::metadata(path)?.modified()?;
    let age = age_days(modified, SystemTime::now());
    tracing::debug!(path = %path.display(), age_days = age, "[Database] status read");
    Ok(DatabaseStatus {
        path: path.to_path_buf(),
        modified,
        age_days: age,
    })
}

/// What: Find the first signature file present in `dir`.
///
/// Inputs:
/// - `dir`: Signature database directory.
///
/// Output:
/// - Path of `main.cvd`, `main.cld`, `daily.cvd` or `daily.cld`, in that preference.
#[must_use]
pub fn locate_signature_file(dir: &Path) -> Option<PathBuf> {
    SIGNATURE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// What: Run `sigtool --info` on a signature file (best effort).
///
/// Inputs:
/// - `file`: Signature file to describe.
///
/// Output:
/// - Trimmed stdout on success; `None` when the tool is missing, fails or hangs.
pub async fn describe_database(file: &Path) -> Option<String> {
    let mut cmd = Command::new("sigtool");
    cmd.arg("--info")
        .arg(file)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    let output = match tokio::time::timeout(SIGTOOL_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "[Database] sigtool unavailable");
            return None;
        }
        Err(_) => {
            tracing::warn!("[Database] sigtool timed out");
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(status = ?output.status, "[Database] sigtool failed");
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}
