//! Command-line argument definition.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use scanmon::targets::TargetGroup;

/// scanmon - interactive ClamAV scans with live progress and a session summary
#[derive(Parser, Debug)]
#[command(name = "scanmon")]
#[command(version)]
#[command(about = "Interactive ClamAV scans with live progress and a session summary", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Per-target scan timeout in seconds (overrides settings)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Update the signature database without asking; a failed update is fatal
    #[arg(long, conflicts_with = "skip_update")]
    pub update: bool,

    /// Skip the signature database update
    #[arg(long)]
    pub skip_update: bool,

    /// Scan a predefined directory group without prompting
    #[arg(long, value_enum, conflicts_with = "path")]
    pub group: Option<GroupArg>,

    /// Scan a single path without prompting
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Print the signature database status and exit
    #[arg(long)]
    pub db_status: bool,

    /// Write freshclam.conf and clamd.conf templates (never overwrites) and exit
    #[arg(long)]
    pub write_engine_config: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Settings file to use instead of ~/.config/scanmon/settings.conf
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Target group names accepted by `--group`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GroupArg {
    /// System library directories
    System,
    /// Application directories
    Applications,
    /// Startup script directories
    Scripts,
    /// Downloads, Documents and Desktop
    User,
    /// System logs
    Logs,
}

impl From<GroupArg> for TargetGroup {
    fn from(value: GroupArg) -> Self {
        match value {
            GroupArg::System => Self::System,
            GroupArg::Applications => Self::Applications,
            GroupArg::Scripts => Self::Scripts,
            GroupArg::User => Self::User,
            GroupArg::Logs => Self::Logs,
        }
    }
}
