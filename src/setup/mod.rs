//! Environment checks run before any scan: platform, privileges, engine
//! presence, engine directories and configuration.

use std::fmt;
use std::path::{Path, PathBuf};

/// Engine config templates.
pub mod templates;

/// What: Supported host platforms and their engine paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    /// Linux distribution packages.
    Linux,
    /// macOS with Homebrew.
    MacOs,
}

impl Platform {
    /// What: Platform of the running binary.
    ///
    /// # Errors
    /// - `SetupError::UnsupportedPlatform` on anything but Linux and macOS.
    pub fn detect() -> Result<Self, SetupError> {
        Self::from_os(std::env::consts::OS)
    }

    /// What: Map an OS name (as in `std::env::consts::OS`) to a platform.
    ///
    /// # Errors
    /// - `SetupError::UnsupportedPlatform` for unknown names.
    pub fn from_os(os: &str) -> Result<Self, SetupError> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            other => Err(SetupError::UnsupportedPlatform {
                os: other.to_string(),
            }),
        }
    }

    /// Engine configuration directory.
    #[must_use]
    pub fn config_dir(self) -> &'static Path {
        Path::new(match self {
            Self::Linux => "/etc/clamav",
            Self::MacOs => "/opt/homebrew/etc",
        })
    }

    /// Default signature database directory.
    #[must_use]
    pub fn database_dir(self) -> &'static Path {
        Path::new(match self {
            Self::Linux => "/var/lib/clamav",
            Self::MacOs => "/opt/homebrew/var/lib/clamav",
        })
    }

    /// Engine log directory.
    #[must_use]
    pub fn log_dir(self) -> &'static Path {
        Path::new(match self {
            Self::Linux => "/var/log/clamav",
            Self::MacOs => "/opt/homebrew/var/log",
        })
    }

    /// The three directories the engine needs.
    #[must_use]
    pub fn engine_dirs(self) -> [&'static Path; 3] {
        [self.config_dir(), self.database_dir(), self.log_dir()]
    }

    /// Location of the daemon configuration file.
    #[must_use]
    pub fn clamd_conf(self) -> PathBuf {
        match self {
            Self::Linux => PathBuf::from("/etc/clamav/clamd.conf"),
            Self::MacOs => PathBuf::from("/opt/homebrew/etc/clamav/clamd.conf"),
        }
    }

    /// Preferred directory for generated engine configs.
    #[must_use]
    pub fn template_dir(self) -> &'static Path {
        Path::new(match self {
            Self::Linux => "/usr/local/etc",
            Self::MacOs => "/opt/homebrew/etc",
        })
    }

    /// Installation commands to show when the engine is missing.
    #[must_use]
    pub const fn install_instructions(self) -> &'static [&'static str] {
        match self {
            Self::MacOs => &["To install ClamAV on macOS, run: brew install clamav"],
            Self::Linux => &[
                "To install ClamAV on Linux:",
                "For Ubuntu/Debian: sudo apt-get update && sudo apt-get install -y clamav clamav-daemon",
                "For Fedora/CentOS: sudo dnf install -y clamav clamav-update",
            ],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
        })
    }
}

/// What: Fatal setup problems (process exits with code 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// Neither Linux nor macOS.
    UnsupportedPlatform {
        /// Reported OS name.
        os: String,
    },
    /// Started with root privileges.
    RunningAsRoot,
    /// Scan engine not found on `PATH`.
    EngineMissing {
        /// Binary that was looked up.
        binary: String,
        /// Platform, for installation hints.
        platform: Platform,
    },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPlatform { os } => write!(
                f,
                "Unsupported operating system: {os}. This application is designed for Linux and macOS."
            ),
            Self::RunningAsRoot => f.write_str(
                "This program should not be run with sudo. Please run it as a normal user.",
            ),
            Self::EngineMissing { binary, .. } => {
                write!(f, "{binary} was not found on PATH")
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// What: Non-fatal setup observation shown as a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// An engine directory does not exist or cannot be accessed.
    MissingDirectory(PathBuf),
    /// Directory not owned by the current user or lacking `rwx` for the owner.
    InsufficientPermissions(PathBuf),
    /// Permissions could not be inspected.
    PermissionCheckFailed {
        /// Directory inspected.
        path: PathBuf,
        /// Error text.
        message: String,
    },
    /// Daemon configuration file missing or unreadable.
    ConfigUnavailable(PathBuf),
    /// Daemon configuration enables neither TCP nor local socket.
    SocketNotConfigured(PathBuf),
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDirectory(p) => write!(
                f,
                "Directory {} does not exist or is not accessible.",
                p.display()
            ),
            Self::InsufficientPermissions(p) => write!(
                f,
                "Insufficient permissions for {}. This may affect the scan.",
                p.display()
            ),
            Self::PermissionCheckFailed { path, message } => {
                write!(f, "Error checking permissions for {}: {message}", path.display())
            }
            Self::ConfigUnavailable(p) => write!(
                f,
                "ClamAV configuration file {} not found or inaccessible.",
                p.display()
            ),
            Self::SocketNotConfigured(p) => write!(
                f,
                "ClamAV configuration {} may not have TCP or Unix socket enabled.",
                p.display()
            ),
        }
    }
}

/// What: Refuse to run with root privileges.
///
/// # Errors
/// - `SetupError::RunningAsRoot` when the effective uid is 0.
pub fn check_not_root() -> Result<(), SetupError> {
    #[cfg(unix)]
    if nix::unistd::geteuid().is_root() {
        return Err(SetupError::RunningAsRoot);
    }
    Ok(())
}

/// What: Locate the scan engine on `PATH`.
///
/// Inputs:
/// - `binary`: Engine binary name or path.
/// - `platform`: Used for the installation hint on failure.
///
/// # Errors
/// - `SetupError::EngineMissing` when the binary cannot be resolved.
pub fn check_engine_installed(binary: &str, platform: Platform) -> Result<PathBuf, SetupError> {
    which::which(binary).map_err(|e| {
        tracing::warn!(binary, error = %e, "[Setup] engine not found");
        SetupError::EngineMissing {
            binary: binary.to_string(),
            platform,
        }
    })
}

/// What: Whether an owner/mode pair grants the current user full access.
///
/// Inputs:
/// - `owner_uid`: Directory owner.
/// - `current_uid`: Effective uid of this process.
/// - `mode`: Permission bits.
///
/// Output:
/// - `true` when owned by the current user with owner `rwx`.
#[must_use]
pub const fn permissions_sufficient(owner_uid: u32, current_uid: u32, mode: u32) -> bool {
    owner_uid == current_uid && mode & 0o700 == 0o700
}

/// What: Inspect ownership and permission bits of `dir`.
///
/// Output:
/// - `None` when sufficient, otherwise a warning finding.
#[must_use]
pub fn check_directory_permissions(dir: &Path) -> Option<Finding> {
    let meta = match std::fs::metadata(dir) {
        Ok(meta) => meta,
        Err(e) => {
            return Some(Finding::PermissionCheckFailed {
                path: dir.to_path_buf(),
                message: e.to_string(),
            });
        }
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let current = nix::unistd::geteuid().as_raw();
        if !permissions_sufficient(meta.uid(), current, meta.mode()) {
            tracing::debug!(
                dir = %dir.display(),
                owner = meta.uid(),
                current,
                mode = format!("{:o}", meta.mode() & 0o777),
                "[Setup] insufficient permissions"
            );
            return Some(Finding::InsufficientPermissions(dir.to_path_buf()));
        }
    }
    #[cfg(not(unix))]
    let _ = meta;
    None
}

/// What: Check that the engine directories exist and are accessible.
///
/// Inputs:
/// - `dirs`: Directories to inspect (usually [`Platform::engine_dirs`]).
///
/// Output:
/// - One finding per problem, in directory order.
#[must_use]
pub fn ensure_directories(dirs: &[&Path]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for dir in dirs {
        if dir.is_dir() {
            findings.extend(check_directory_permissions(dir));
        } else {
            findings.push(Finding::MissingDirectory(dir.to_path_buf()));
        }
    }
    findings
}

/// What: Whether a daemon config enables a TCP or local socket.
///
/// Details:
/// - Commented-out directives do not count.
#[must_use]
pub fn config_has_socket(contents: &str) -> bool {
    contents
        .lines()
        .filter(|line| !crate::util::config::skip_comment_or_empty(line))
        .map(str::trim_start)
        .any(|line| line.starts_with("TCPSocket") || line.starts_with("LocalSocket"))
}

/// What: Check the daemon configuration file.
///
/// Output:
/// - `None` when a socket is configured, otherwise a warning finding.
#[must_use]
pub fn check_engine_config(path: &Path) -> Option<Finding> {
    match std::fs::read_to_string(path) {
        Ok(contents) if config_has_socket(&contents) => None,
        Ok(_) => Some(Finding::SocketNotConfigured(path.to_path_buf())),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "[Setup] config unreadable");
            Some(Finding::ConfigUnavailable(path.to_path_buf()))
        }
    }
}
