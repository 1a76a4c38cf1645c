//! Named groups of commonly targeted directories.

use std::fmt;
use std::path::{Path, PathBuf};

/// What: Predefined scan target groups offered by the selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetGroup {
    /// System library directories.
    System,
    /// Installed applications.
    Applications,
    /// Startup and init scripts.
    Scripts,
    /// Per-user download, document and desktop folders.
    User,
    /// System log directory.
    Logs,
}

impl TargetGroup {
    /// Every group in selector order.
    pub const ALL: [Self; 5] = [
        Self::System,
        Self::Applications,
        Self::Scripts,
        Self::User,
        Self::Logs,
    ];

    /// Selector label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::System => "System directories",
            Self::Applications => "Application directories",
            Self::Scripts => "Script directories",
            Self::User => "User directories",
            Self::Logs => "Log files",
        }
    }

    /// What: Directories belonging to this group.
    ///
    /// Inputs:
    /// - `home`: Current user's home directory, when known.
    ///
    /// Output:
    /// - Paths in scan order; home-relative entries are omitted without a home.
    #[must_use]
    pub fn paths(self, home: Option<&Path>) -> Vec<PathBuf> {
        let fixed: &[&str] = match self {
            Self::System => &["/System/Library", "/Library", "/usr/lib", "/usr/local/lib"],
            Self::Applications => &["/Applications"],
            Self::Scripts => &["/etc/rc.d", "/etc/init.d", "/Library/StartupItems"],
            Self::User => &[],
            Self::Logs => &["/var/log"],
        };
        let in_home: &[&str] = match self {
            Self::Applications => &["Applications"],
            Self::User => &["Downloads", "Documents", "Desktop"],
            Self::System | Self::Scripts | Self::Logs => &[],
        };
        let mut out: Vec<PathBuf> = fixed.iter().map(PathBuf::from).collect();
        if let Some(home) = home {
            out.extend(in_home.iter().map(|rel| home.join(rel)));
        }
        out
    }
}

impl fmt::Display for TargetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What: Operator's choice of what to scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetSelection {
    /// A named group.
    Group(TargetGroup),
    /// A single custom path.
    Custom(PathBuf),
}

impl TargetSelection {
    /// What: Expand the selection into existing targets.
    ///
    /// Inputs:
    /// - `home`: Home directory for home-relative group entries.
    ///
    /// Output:
    /// - `(existing, missing)`, both in selection order.
    ///
    /// Details:
    /// - Group directories that are absent on this platform are reported as
    ///   missing instead of being handed to the engine. A custom path is kept
    ///   even when missing so the engine reports the problem itself.
    #[must_use]
    pub fn resolve(&self, home: Option<&Path>) -> (Vec<PathBuf>, Vec<PathBuf>) {
        match self {
            Self::Custom(path) => (vec![path.clone()], Vec::new()),
            Self::Group(group) => group
                .paths(home)
                .into_iter()
                .partition(|p| p.symlink_metadata().is_ok()),
        }
    }

    /// Short description for logs and the summary header.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Group(group) => group.label().to_string(),
            Self::Custom(path) => path.display().to_string(),
        }
    }
}
