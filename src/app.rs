//! Top-level flow: environment checks, database refresh, target choice and
//! the scan session.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::database::{self, DatabaseStatus};
use crate::engine::{
    AbortReason, CancelToken, EngineCommand, ProgressReporter, RunnerError, UpdateStatus,
    run_database_update,
};
use crate::paths::home_dir;
use crate::prompt::{PromptError, Prompter, UpdateChoice};
use crate::report::{session_lines, target_lines};
use crate::session::{ClamScanner, SessionSummary, run_session};
use crate::settings::Settings;
use crate::setup::templates::{TemplateWrite, write_engine_configs};
use crate::setup::{
    Platform, SetupError, check_directory_permissions, check_engine_config,
    check_engine_installed, check_not_root, ensure_directories,
};
use crate::targets::TargetSelection;

/// What: How the database refresh step is decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    /// Ask the operator.
    Ask,
    /// Always update; a failed update is fatal.
    Always,
    /// Never update.
    Never,
}

/// What: Everything `run` needs besides the interactive collaborators.
#[derive(Clone, Debug)]
pub struct AppOptions {
    /// Effective settings (file values with CLI overrides applied).
    pub settings: Settings,
    /// Database refresh policy.
    pub update: UpdateMode,
    /// Preselected targets; prompts when `None`.
    pub selection: Option<TargetSelection>,
    /// Print database status and stop.
    pub db_status_only: bool,
    /// Write engine config templates and stop.
    pub write_engine_config: bool,
}

/// What: Unrecoverable application errors (exit code 1).
#[derive(Debug)]
pub enum AppError {
    /// Platform, privilege or engine check failed.
    Setup(SetupError),
    /// The operator required a database update and it failed.
    UpdateRequired(String),
    /// A prompt could not be answered.
    Prompt(PromptError),
    /// Filesystem failure outside a scan.
    Io(std::io::Error),
}

impl AppError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Setup(_) | Self::UpdateRequired(_) | Self::Prompt(_) | Self::Io(_) => 1,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "{e}"),
            Self::UpdateRequired(msg) => write!(f, "database update failed: {msg}"),
            Self::Prompt(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Setup(e) => Some(e),
            Self::Prompt(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::UpdateRequired(_) => None,
        }
    }
}

impl From<SetupError> for AppError {
    fn from(value: SetupError) -> Self {
        Self::Setup(value)
    }
}

impl From<PromptError> for AppError {
    fn from(value: PromptError) -> Self {
        Self::Prompt(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// What: Result of the database step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UpdateStep {
    /// Continue to target selection.
    Proceed,
    /// The operator stopped the run; exit normally.
    Stop,
}

/// What: Run the whole interactive flow.
///
/// Inputs:
/// - `options`: Settings and CLI choices.
/// - `prompter`: Source of operator answers.
/// - `reporter`: Live progress sink.
/// - `cancel`: Session token raised by the signal handler.
///
/// Output:
/// - `Ok(Some(summary))` after a session, `Ok(None)` when the run stopped
///   earlier without error (status-only modes, operator abort).
///
/// # Errors
/// - `AppError::Setup` for fatal environment problems.
/// - `AppError::UpdateRequired` when a required update failed.
/// - `AppError::Prompt` when the terminal could not be read.
pub async fn run<P: Prompter>(
    options: AppOptions,
    prompter: &mut P,
    reporter: &dyn ProgressReporter,
    cancel: CancelToken,
) -> Result<Option<SessionSummary>, AppError> {
    let settings = &options.settings;
    let platform = Platform::detect()?;
    check_not_root()?;
    tracing::info!(%platform, "[App] environment accepted");

    if options.write_engine_config {
        print_template_results(&write_engine_configs(platform));
        return Ok(None);
    }

    let engine = check_engine_installed(&settings.scan_binary, platform)?;
    tracing::info!(engine = %engine.display(), "[App] scan engine found");

    let db_dir = settings
        .database_dir
        .clone()
        .unwrap_or_else(|| platform.database_dir().to_path_buf());
    print_environment_findings(platform, &db_dir);
    let status = print_database_status(&db_dir, settings.stale_after_days);
    if options.db_status_only {
        return Ok(None);
    }

    if database_step(&options, prompter, reporter, &cancel, status.as_ref(), &db_dir).await?
        == UpdateStep::Stop
    {
        return Ok(None);
    }

    let selection = match options.selection.clone() {
        Some(selection) => selection,
        None => {
            let cwd = std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| ".".to_string());
            match answer(prompter.target_selection(&cwd))? {
                Some(selection) => selection,
                None => return Ok(None),
            }
        }
    };
    let targets = resolve_targets(&selection);
    if targets.is_empty() {
        println!("Nothing to scan for {}.", selection.describe());
        return Ok(None);
    }

    println!("Press Ctrl+C at any time to abort the scan.");
    let mut scanner = ClamScanner {
        command: EngineCommand::scanner(&settings.scan_binary, &settings.scan_extra_args)
            .with_infected_exit_code(settings.infected_exit_code),
        timeout: settings.scan_timeout,
        cancel: cancel.clone(),
        reporter,
    };
    let summary = run_session(&targets, &mut scanner, |outcome| {
        println!();
        for line in target_lines(outcome) {
            println!("{line}");
        }
    })
    .await;

    println!();
    for line in session_lines(&summary) {
        println!("{line}");
    }
    Ok(Some(summary))
}

/// What: Turn a prompt result into an answer, treating operator interrupts as a stop.
///
/// Output:
/// - `Ok(Some(value))`, `Ok(None)` for Esc/Ctrl+C, `Err` for terminal failures.
fn answer<T>(result: Result<T, PromptError>) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_interrupt() => {
            println!("Aborted. Exiting...");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Print warning-level environment findings.
fn print_environment_findings(platform: Platform, db_dir: &Path) {
    let mut findings = ensure_directories(&platform.engine_dirs());
    if db_dir != platform.database_dir() {
        if db_dir.is_dir() {
            findings.extend(check_directory_permissions(db_dir));
        } else {
            findings.push(crate::setup::Finding::MissingDirectory(db_dir.to_path_buf()));
        }
    }
    findings.extend(check_engine_config(&platform.clamd_conf()));
    for finding in findings {
        tracing::warn!(%finding, "[Setup] environment warning");
        eprintln!("Warning: {finding}");
    }
}

/// What: Report the signature database age.
///
/// Output:
/// - Status of the preferred signature file, if one was found.
fn print_database_status(db_dir: &Path, stale_after_days: f64) -> Option<DatabaseStatus> {
    let Some(file) = database::locate_signature_file(db_dir) else {
        eprintln!(
            "Warning: no signature database found in {}. You may need to update it.",
            db_dir.display()
        );
        return None;
    };
    match database::database_status(&file) {
        Ok(status) => {
            println!(
                "ClamAV database is approximately {:.1} days old (updated {}).",
                status.age_days,
                status.modified_display()
            );
            if status.is_stale(stale_after_days) {
                println!(
                    "Your database is more than {stale_after_days} days old. It's recommended to update."
                );
            }
            Some(status)
        }
        Err(e) => {
            eprintln!("Unable to check database age ({e}). You may need to update manually.");
            None
        }
    }
}

/// What: Decide on and perform the database refresh.
///
/// Output:
/// - `Proceed` or `Stop`; `Err(UpdateRequired)` when a required update failed.
async fn database_step<P: Prompter>(
    options: &AppOptions,
    prompter: &mut P,
    reporter: &dyn ProgressReporter,
    cancel: &CancelToken,
    status: Option<&DatabaseStatus>,
    db_dir: &Path,
) -> Result<UpdateStep, AppError> {
    let choice = match options.update {
        UpdateMode::Always => UpdateChoice::UpdateNow,
        UpdateMode::Never => UpdateChoice::Skip,
        UpdateMode::Ask => match answer(prompter.update_choice(status))? {
            Some(choice) => choice,
            None => return Ok(UpdateStep::Stop),
        },
    };
    match choice {
        UpdateChoice::AlreadyUpdated => {
            println!("Skipping database update as it has been manually updated.");
            return Ok(UpdateStep::Proceed);
        }
        UpdateChoice::Skip => {
            println!("Skipping database update. Note that this may affect scan accuracy.");
            return Ok(UpdateStep::Proceed);
        }
        UpdateChoice::UpdateNow => {}
    }

    let settings = &options.settings;
    let command = EngineCommand::updater(&settings.updater_binary, settings.updater_use_sudo);
    let failure = match run_database_update(&command, settings.update_timeout, cancel, reporter).await {
        Ok(outcome) => match outcome.status {
            UpdateStatus::Updated => {
                print_update_success(&outcome.output, &outcome.stderr, db_dir).await;
                return Ok(UpdateStep::Proceed);
            }
            UpdateStatus::Aborted(AbortReason::Cancelled) => {
                println!("Database update cancelled. Exiting...");
                return Ok(UpdateStep::Stop);
            }
            UpdateStatus::Aborted(AbortReason::TimedOut) => format!(
                "updater timed out after {} seconds",
                settings.update_timeout.as_secs()
            ),
        },
        Err(e) => describe_update_error(&e),
    };
    if cancel.is_cancelled() {
        println!("Database update interrupted. Exiting...");
        return Ok(UpdateStep::Stop);
    }

    eprintln!("Error updating database: {failure}");
    eprintln!("You may need to update manually. Run: {}", manual_update_command(settings));
    match options.update {
        UpdateMode::Always => Err(AppError::UpdateRequired(failure)),
        UpdateMode::Ask | UpdateMode::Never => {
            match answer(prompter.confirm("Continue scanning with the current database?"))? {
                Some(true) => Ok(UpdateStep::Proceed),
                Some(false) => Err(AppError::UpdateRequired(failure)),
                None => Ok(UpdateStep::Stop),
            }
        }
    }
}

/// Error text for a failed update, including the updater's stderr when present.
fn describe_update_error(err: &RunnerError) -> String {
    match err {
        RunnerError::NonZeroExit { stderr, .. } if !stderr.trim().is_empty() => {
            format!("{err}: {}", stderr.trim())
        }
        _ => err.to_string(),
    }
}

/// Command the operator can run by hand.
fn manual_update_command(settings: &Settings) -> String {
    if settings.updater_use_sudo {
        format!("sudo {}", settings.updater_binary)
    } else {
        settings.updater_binary.clone()
    }
}

/// Print updater output and best-effort database information.
async fn print_update_success(output: &str, stderr: &str, db_dir: &Path) {
    println!("Database updated successfully.");
    if !output.trim().is_empty() {
        println!("Update summary:");
        println!("{}", output.trim_end());
    }
    if !stderr.trim().is_empty() {
        eprintln!("Warnings or errors: {}", stderr.trim_end());
    }
    match database::locate_signature_file(db_dir) {
        Some(file) => {
            if let Some(info) = database::describe_database(&file).await {
                println!("\nDatabase Information:");
                println!("{info}");
            }
        }
        None => eprintln!(
            "Unable to find a signature file in {}. The database may not have been initialized properly.",
            db_dir.display()
        ),
    }
}

/// What: Expand a selection, printing any group directories that do not exist.
fn resolve_targets(selection: &TargetSelection) -> Vec<PathBuf> {
    let home = home_dir();
    let (existing, missing) = selection.resolve(home.as_deref());
    for path in &missing {
        tracing::info!(path = %path.display(), "[App] skipping missing target");
        println!("Skipping {} (not present on this system).", path.display());
    }
    existing
}

/// Print the outcome of writing engine config templates.
fn print_template_results(results: &[TemplateWrite]) {
    for result in results {
        match result {
            TemplateWrite::Created(path) => println!("Created {}", path.display()),
            TemplateWrite::AlreadyPresent(path) => {
                println!("{} already exists; left unchanged.", path.display());
            }
            TemplateWrite::Failed { name, attempts } => {
                for (dir, error) in attempts {
                    eprintln!("Error creating {name} in {}: {error}", dir.display());
                }
                eprintln!(
                    "Failed to create {name}. Please ensure you have the necessary permissions or create it manually."
                );
            }
        }
    }
}
