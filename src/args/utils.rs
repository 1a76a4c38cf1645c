//! Shared utilities for argument processing.

use std::time::Duration;

use scanmon::app::{AppOptions, UpdateMode};
use scanmon::settings::Settings;
use scanmon::targets::TargetSelection;

use super::Args;

/// What: Determine the log level based on command-line arguments.
///
/// Inputs:
/// - `args`: Parsed command-line arguments.
///
/// Output:
/// - Log level string (trace, debug, info, warn, error).
///
/// Details:
/// - Verbose flag overrides the `--log-level` argument.
#[must_use]
pub fn determine_log_level(args: &Args) -> String {
    if args.verbose {
        "debug".to_string()
    } else {
        args.log_level.clone()
    }
}

/// What: Apply command-line overrides on top of file settings.
///
/// Inputs:
/// - `args`: Parsed arguments.
/// - `settings`: Settings loaded from disk.
///
/// Output:
/// - Effective settings.
#[must_use]
pub fn apply_overrides(args: &Args, mut settings: Settings) -> Settings {
    if let Some(secs) = args.timeout {
        settings.scan_timeout = Duration::from_secs(secs);
    }
    settings
}

/// What: Build the application options from arguments and settings.
///
/// Inputs:
/// - `args`: Parsed arguments.
/// - `settings`: Settings loaded from disk.
///
/// Output:
/// - `AppOptions` for `scanmon::app::run`.
#[must_use]
pub fn app_options(args: &Args, settings: Settings) -> AppOptions {
    let update = if args.update {
        UpdateMode::Always
    } else if args.skip_update {
        UpdateMode::Never
    } else {
        UpdateMode::Ask
    };
    let selection = args
        .group
        .map(|g| TargetSelection::Group(g.into()))
        .or_else(|| args.path.clone().map(TargetSelection::Custom));
    AppOptions {
        settings: apply_overrides(args, settings),
        update,
        selection,
        db_status_only: args.db_status,
        write_engine_config: args.write_engine_config,
    }
}
