//! Engine configuration templates (`freshclam.conf`, `clamd.conf`).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::Platform;

/// Fallback directory when the platform's preferred one is not writable.
pub const FALLBACK_DIR: &str = "/etc";

/// What: One engine configuration file to generate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// File name inside the target directory.
    pub name: &'static str,
    /// File contents.
    pub contents: String,
}

/// What: Result of writing one template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateWrite {
    /// File created at this path.
    Created(PathBuf),
    /// A file already existed at this path and was left untouched.
    AlreadyPresent(PathBuf),
    /// Every candidate directory failed.
    Failed {
        /// Template file name.
        name: &'static str,
        /// `(directory, error)` per attempt.
        attempts: Vec<(PathBuf, String)>,
    },
}

/// Updater configuration with platform paths.
#[must_use]
pub fn freshclam_conf(platform: Platform) -> String {
    let db_dir = platform.database_dir().display();
    let log = match platform {
        Platform::Linux => PathBuf::from("/var/log/freshclam.log"),
        Platform::MacOs => platform.log_dir().join("freshclam.log"),
    };
    format!(
        "DatabaseMirror database.clamav.net
UpdateLogFile {log}
LogVerbose false
LogSyslog false
LogFacility LOG_LOCAL6
LogFileMaxSize 2M
LogTime true
Foreground false
Debug false
MaxAttempts 5
DatabaseDirectory {db_dir}
DNSDatabaseInfo current.cvd.clamav.net
ConnectTimeout 30
ReceiveTimeout 30
TestDatabases yes
ScriptedUpdates yes
CompressLocalDatabase no
SafeBrowsing false
Bytecode true
",
        log = log.display(),
    )
}

/// Daemon configuration with platform paths.
#[must_use]
pub fn clamd_conf(platform: Platform) -> String {
    let log = match platform {
        Platform::Linux => PathBuf::from("/var/log/clamd.log"),
        Platform::MacOs => platform.log_dir().join("clamd.log"),
    };
    format!(
        "LogFile {log}
LogTime true
LogVerbose false
ExtendedDetectionInfo true
LogClean false
LogSyslog false
DetectPUA false
ScanPE true
ScanELF true
DetectBrokenExecutables false
ScanOLE2 true
ScanPDF true
ScanSWF true
ScanXMLDOCS true
ScanHWP3 true
ScanMail true
PhishingSignatures true
PhishingScanURLs true
ScanHTML true
ScanArchive true
",
        log = log.display(),
    )
}

/// Both templates for `platform`.
#[must_use]
pub fn engine_configs(platform: Platform) -> [EngineConfig; 2] {
    [
        EngineConfig {
            name: "freshclam.conf",
            contents: freshclam_conf(platform),
        },
        EngineConfig {
            name: "clamd.conf",
            contents: clamd_conf(platform),
        },
    ]
}

/// What: Create `dir/name` without ever replacing an existing file.
///
/// Output:
/// - `Ok(true)` when created, `Ok(false)` when a file was already present.
fn create_new(dir: &Path, config: &EngineConfig) -> io::Result<bool> {
    fs::create_dir_all(dir)?;
    let path = dir.join(config.name);
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(mut file) => {
            file.write_all(config.contents.as_bytes())?;
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// What: Write each template into the first directory that accepts it.
///
/// Inputs:
/// - `configs`: Templates to write.
/// - `dirs`: Candidate directories in preference order.
///
/// Output:
/// - One [`TemplateWrite`] per template.
///
/// Details:
/// - An existing file in any candidate directory stops the search for that template.
#[must_use]
pub fn write_configs_in(configs: &[EngineConfig], dirs: &[&Path]) -> Vec<TemplateWrite> {
    configs
        .iter()
        .map(|config| {
            let mut attempts = Vec::new();
            for dir in dirs {
                match create_new(dir, config) {
                    Ok(true) => {
                        tracing::info!(dir = %dir.display(), name = config.name, "[Setup] template written");
                        return TemplateWrite::Created(dir.join(config.name));
                    }
                    Ok(false) => return TemplateWrite::AlreadyPresent(dir.join(config.name)),
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), name = config.name, error = %e, "[Setup] template write failed");
                        attempts.push((dir.to_path_buf(), e.to_string()));
                    }
                }
            }
            TemplateWrite::Failed {
                name: config.name,
                attempts,
            }
        })
        .collect()
}

/// What: Write both engine templates for `platform`.
///
/// Output:
/// - Results for `freshclam.conf` and `clamd.conf`, tried in the platform's
///   template directory first and `/etc` second.
#[must_use]
pub fn write_engine_configs(platform: Platform) -> Vec<TemplateWrite> {
    let dirs = [platform.template_dir(), Path::new(FALLBACK_DIR)];
    write_configs_in(&engine_configs(platform), &dirs)
}
