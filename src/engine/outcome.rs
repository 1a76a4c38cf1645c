//! Structured results and errors produced by the process runner.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Why a run was stopped before the process exited on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// The configured timeout elapsed.
    TimedOut,
    /// The session's cancel token fired (operator interrupt).
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => f.write_str("timed out"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Why a scan failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanFailure {
    /// The engine exited with a non-zero status (`None` when killed by a signal).
    NonZeroExit {
        /// Exit code if one was reported.
        code: Option<i32>,
    },
    /// The engine could not be launched or its output could not be read.
    Launch {
        /// Human-readable cause.
        message: String,
    },
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonZeroExit { code: Some(code) } => write!(f, "scan exited with code {code}"),
            Self::NonZeroExit { code: None } => f.write_str("scan was terminated by a signal"),
            Self::Launch { message } => f.write_str(message),
        }
    }
}

/// What: Resolution of one scan.
///
/// Details:
/// - The infected count lives inside `Completed`, so aborted and failed
///   outcomes cannot carry one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanStatus {
    /// The engine finished normally.
    Completed {
        /// Files reported infected by the engine's summary (0 if it was unparsable).
        infected: u64,
    },
    /// Stopped by timeout or cancellation; remaining targets are skipped.
    Aborted(AbortReason),
    /// Non-zero exit or launch problem; the session moves on.
    Failed(ScanFailure),
}

/// Result of running the engine against one target.
#[derive(Clone, Debug)]
pub struct ScanOutcome {
    /// The target that was scanned.
    pub path: PathBuf,
    /// How the scan resolved.
    pub status: ScanStatus,
    /// Elapsed wall-clock time from launch to resolution.
    pub duration: Duration,
    /// Captured standard output.
    pub transcript: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ScanOutcome {
    /// Infected count, present only for completed scans.
    #[must_use]
    pub const fn infected_count(&self) -> Option<u64> {
        match self.status {
            ScanStatus::Completed { infected } => Some(infected),
            ScanStatus::Aborted(_) | ScanStatus::Failed(_) => None,
        }
    }

    /// Whether this outcome stops the session.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self.status, ScanStatus::Aborted(_))
    }

    /// What: Convert a runner error into a `Failed` outcome for `path`.
    ///
    /// Inputs:
    /// - `path`: Target the error belongs to.
    /// - `err`: Error returned by the runner.
    ///
    /// Output:
    /// - Outcome keeping whatever duration and output the error carried.
    #[must_use]
    pub fn from_error(path: PathBuf, err: &RunnerError) -> Self {
        match err {
            RunnerError::NonZeroExit {
                code,
                duration,
                transcript,
                stderr,
                ..
            } => Self {
                path,
                status: ScanStatus::Failed(ScanFailure::NonZeroExit { code: *code }),
                duration: *duration,
                transcript: transcript.clone(),
                stderr: stderr.clone(),
            },
            RunnerError::Spawn { .. } | RunnerError::Io(_) => Self {
                path,
                status: ScanStatus::Failed(ScanFailure::Launch {
                    message: err.to_string(),
                }),
                duration: Duration::ZERO,
                transcript: String::new(),
                stderr: String::new(),
            },
        }
    }
}

/// Resolution of a signature-database update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The updater exited with status 0.
    Updated,
    /// Stopped by timeout or cancellation.
    Aborted(AbortReason),
}

/// Result of running the signature updater.
#[derive(Clone, Debug)]
pub struct UpdateOutcome {
    /// How the update resolved.
    pub status: UpdateStatus,
    /// Elapsed wall-clock time.
    pub duration: Duration,
    /// Captured standard output.
    pub output: String,
    /// Captured standard error.
    pub stderr: String,
}

/// What: Error type for launching and supervising external processes.
///
/// Output: Implements `Display`/`Error` for ergonomic propagation.
///
/// Details:
/// - `NonZeroExit` carries everything captured so callers can still report it.
#[derive(Debug)]
pub enum RunnerError {
    /// The program could not be started.
    Spawn {
        /// Program that failed to launch.
        program: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// I/O failure while supervising the child.
    Io(std::io::Error),
    /// The program exited on its own with a non-zero status.
    NonZeroExit {
        /// Program that failed.
        program: String,
        /// Exit code (`None` when terminated by a signal).
        code: Option<i32>,
        /// Time until exit.
        duration: Duration,
        /// Captured standard output.
        transcript: String,
        /// Captured standard error.
        stderr: String,
    },
}

impl RunnerError {
    /// Exit code for `NonZeroExit`, `None` otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { code, .. } => *code,
            Self::Spawn { .. } | Self::Io(_) => None,
        }
    }
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => write!(f, "failed to launch {program}: {source}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::NonZeroExit {
                program,
                code: Some(code),
                ..
            } => write!(f, "{program} exited with code {code}"),
            Self::NonZeroExit {
                program,
                code: None,
                ..
            } => write!(f, "{program} was terminated by a signal"),
        }
    }
}

impl std::error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            Self::NonZeroExit { .. } => None,
        }
    }
}

impl From<std::io::Error> for RunnerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
