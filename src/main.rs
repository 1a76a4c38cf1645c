//! scanmon binary entrypoint kept minimal. The full flow lives in `scanmon::app`.

mod args;

use std::fmt;
use std::process::ExitCode;
use std::sync::OnceLock;

use clap::Parser;
use scanmon::app::{self, AppError};
use scanmon::engine::CancelToken;
use scanmon::prompt::TerminalPrompter;
use scanmon::report::TerminalReporter;
use scanmon::settings::load_settings;
use scanmon::setup::SetupError;

/// Log timestamp in local time.
struct ScanmonTimer;

impl tracing_subscriber::fmt::time::FormatTime for ScanmonTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Keeps the non-blocking log writer flushing until exit.
static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// What: Initialize tracing to `~/.config/scanmon/logs/scanmon.log`.
///
/// Inputs:
/// - `level`: Default filter when `RUST_LOG` is unset.
///
/// Details:
/// - Falls back to a stderr logger when the log file cannot be opened.
fn init_logging(level: &str) {
    let mut log_path = scanmon::paths::logs_dir();
    log_path.push("scanmon.log");
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(ScanmonTimer)
                .init();
            let _ = LOG_GUARD.set(guard);
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_timer(ScanmonTimer)
                .init();
            tracing::warn!(error = %e, "failed to open log file; using stderr");
        }
    }
}

/// What: Cancel the session token on SIGINT or SIGTERM.
///
/// Inputs:
/// - `cancel`: Token of the current session.
///
/// Output:
/// - Handle of the listening task (aborted once the session ends).
fn spawn_signal_task(cancel: CancelToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut term = match signal(SignalKind::terminate()) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(error = %e, "[Signal] SIGTERM handler unavailable");
                    None
                }
            };
            let terminated = async {
                match term.as_mut() {
                    Some(s) => {
                        s.recv().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        tracing::warn!(error = %e, "[Signal] Ctrl+C handler unavailable");
                        return;
                    }
                }
                () = terminated => {}
            }
        }
        #[cfg(not(unix))]
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "[Signal] Ctrl+C handler unavailable");
            return;
        }
        tracing::warn!("[Signal] interrupt received; aborting");
        eprintln!("\nScan aborted. Cleaning up...");
        cancel.cancel();
    })
}

/// Print the error and any follow-up instructions.
fn report_error(err: &AppError) {
    eprintln!("Error: {err}");
    match err {
        AppError::Setup(SetupError::EngineMissing { platform, .. }) => {
            for line in platform.install_instructions() {
                eprintln!("{line}");
            }
            eprintln!("After installation, run this program again.");
        }
        AppError::UpdateRequired(_) => {
            eprintln!("Then run this program again and choose 'No, I have manually updated it'.");
        }
        AppError::Setup(_) | AppError::Prompt(_) | AppError::Io(_) => {}
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = args::Args::parse();
    init_logging(&args::determine_log_level(&args));
    if args.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(scanmon::paths::settings_path);
    let settings = load_settings(&settings_path);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        settings = %settings_path.display(),
        "scanmon starting"
    );

    println!("Welcome to ScanMon {}!", env!("CARGO_PKG_VERSION"));
    println!(
        "This application uses ClamAV and Freshclam for virus scanning and database updates.\n"
    );

    let cancel = CancelToken::new();
    let signals = spawn_signal_task(cancel.clone());
    let mut prompter = TerminalPrompter::new();
    let reporter = TerminalReporter::new();
    let result = app::run(
        args::app_options(&args, settings),
        &mut prompter,
        &reporter,
        cancel,
    )
    .await;
    signals.abort();

    let code = match result {
        Ok(summary) => {
            tracing::info!(scanned = summary.is_some(), "scanmon finished");
            println!("Execution complete.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "application error");
            report_error(&err);
            ExitCode::from(err.exit_code())
        }
    };
    tracing::info!("scanmon exited");
    code
}
