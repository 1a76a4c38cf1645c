//! Supervision of external scan and update processes.
//!
//! One child runs at a time. Its stdout and stderr are read by two tokio tasks
//! feeding a single channel; the supervising loop races process exit, the
//! timeout, and the cancel token, and retires the losers before returning.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::cancel::CancelToken;
use super::classify::{LineKind, ProgressState, classify_scan_line, has_summary, parse_infected_count};
use super::lines::LineAssembler;
use super::outcome::{AbortReason, RunnerError, ScanOutcome, ScanStatus, UpdateOutcome, UpdateStatus};
use super::reporter::ProgressReporter;

/// How long to keep reading pipes after the child exited (grandchildren may hold them open).
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);
/// How long a terminated child gets to exit after SIGTERM before SIGKILL.
const TERM_GRACE: Duration = Duration::from_secs(2);
/// Read buffer size for the pipe readers.
const READ_CHUNK: usize = 4096;

/// What: External program invocation (binary plus fixed leading arguments).
///
/// Details:
/// - Arguments are passed as a vector, never through a shell, so target paths
///   containing shell metacharacters are inert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments placed before the target path.
    pub args: Vec<String>,
    /// Non-zero exit code that still counts as a completed scan when the
    /// transcript carries the summary marker.
    pub infected_exit_code: Option<i32>,
    /// Start the child in its own process group so terminal interrupts reach
    /// only this program, which then terminates the child itself.
    pub own_process_group: bool,
}

impl EngineCommand {
    /// What: Scan engine invocation `<binary> -r --verbose [extra...]`.
    ///
    /// Inputs:
    /// - `binary`: Engine binary name or path.
    /// - `extra_args`: Additional arguments inserted before the target path.
    ///
    /// Output:
    /// - Command that runs in its own process group.
    #[must_use]
    pub fn scanner(binary: &str, extra_args: &[String]) -> Self {
        let mut args = vec!["-r".to_string(), "--verbose".to_string()];
        args.extend(extra_args.iter().cloned());
        Self {
            program: binary.to_string(),
            args,
            infected_exit_code: None,
            own_process_group: true,
        }
    }

    /// What: Updater invocation, optionally through `sudo`.
    ///
    /// Inputs:
    /// - `binary`: Updater binary name or path.
    /// - `use_sudo`: Prefix with `sudo`.
    ///
    /// Output:
    /// - Command that stays in the terminal's process group so `sudo` can prompt.
    #[must_use]
    pub fn updater(binary: &str, use_sudo: bool) -> Self {
        let (program, args) = if use_sudo {
            ("sudo".to_string(), vec![binary.to_string()])
        } else {
            (binary.to_string(), Vec::new())
        };
        Self {
            program,
            args,
            infected_exit_code: None,
            own_process_group: false,
        }
    }

    /// Set the exit code that reports detections rather than failure.
    #[must_use]
    pub const fn with_infected_exit_code(mut self, code: Option<i32>) -> Self {
        self.infected_exit_code = code;
        self
    }

    /// Human-readable command line for messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What: Parameters for one scan (the runner's whole configuration surface).
#[derive(Clone, Copy, Debug)]
pub struct ScanRequest<'a> {
    /// Path handed to the engine as its final argument.
    pub target: &'a Path,
    /// Estimated item count used only for progress scaling.
    pub expected_items: u64,
    /// Maximum wall-clock time before the scan is aborted.
    pub timeout: Duration,
    /// Session cancel token.
    pub cancel: &'a CancelToken,
}

/// Which pipe a chunk came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Message from a pipe reader task.
#[derive(Debug)]
enum StreamEvent {
    /// Raw bytes read from a pipe.
    Chunk(Stream, Vec<u8>),
    /// The pipe reached EOF or failed.
    Closed(Stream),
}

/// First completion source to fire.
#[derive(Clone, Copy, Debug)]
enum Resolution {
    /// The process exited on its own.
    Exited(ExitStatus),
    /// The timeout or cancel token fired first.
    Aborted(AbortReason),
}

/// Everything captured while supervising one process.
#[derive(Debug)]
struct Supervised {
    /// How the race resolved.
    resolution: Resolution,
    /// Launch to exit, or launch to the abort decision.
    duration: Duration,
    /// Verbatim stdout lines joined with `\n`.
    stdout: String,
    /// Verbatim stderr lines joined with `\n`.
    stderr: String,
}

/// Per-operation handling of decoded output.
trait OutputSink {
    /// A complete stdout line.
    fn stdout_line(&mut self, line: &str);
    /// A raw stdout chunk arrived (before line splitting).
    fn stdout_chunk(&mut self) {}
    /// A complete stderr line.
    fn stderr_line(&mut self, line: &str);
}

/// Scan output handling: classification, progress, findings.
struct ScanSink<'a> {
    /// Observed/expected counters.
    progress: ProgressState,
    /// Where progress and findings go.
    reporter: &'a dyn ProgressReporter,
}

impl OutputSink for ScanSink<'_> {
    fn stdout_line(&mut self, line: &str) {
        match classify_scan_line(line) {
            LineKind::Found => {
                tracing::warn!(line = %line, "[Runner] positive match");
                self.reporter.finding(line);
            }
            LineKind::Examined => {
                let percent = self.progress.record_examined();
                self.reporter
                    .scan_progress(self.progress.observed_count, percent);
            }
            LineKind::Other => {}
        }
    }

    fn stderr_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        tracing::warn!(line = %line, "[Runner] scan engine stderr");
        self.reporter.warning(line);
    }
}

/// Updater output handling: cosmetic heartbeat only.
struct UpdateSink<'a> {
    /// Where heartbeats and warnings go.
    reporter: &'a dyn ProgressReporter,
}

impl OutputSink for UpdateSink<'_> {
    fn stdout_line(&mut self, line: &str) {
        tracing::debug!(line = %line, "[Runner] updater output");
    }

    fn stdout_chunk(&mut self) {
        self.reporter.heartbeat();
    }

    fn stderr_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        tracing::warn!(line = %line, "[Runner] updater stderr");
        self.reporter.warning(line);
    }
}

/// What: Spawn a task that forwards a pipe's bytes to the supervisor.
///
/// Inputs:
/// - `reader`: Child pipe.
/// - `stream`: Which pipe it is.
/// - `tx`: Channel to the supervising loop.
///
/// Output:
/// - Join handle, aborted by the supervisor before it returns.
///
/// Details:
/// - Reads in 4KB chunks; sends `Closed` on EOF or read error.
fn spawn_reader<R>(mut reader: R, stream: Stream, tx: mpsc::UnboundedSender<StreamEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut total: usize = 0;
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    tracing::trace!(?stream, total, "[Reader] EOF");
                    break;
                }
                Ok(n) => {
                    total += n;
                    if tx.send(StreamEvent::Chunk(stream, buf[..n].to_vec())).is_err() {
                        tracing::trace!(?stream, "[Reader] supervisor gone");
                        return;
                    }
                }
                Err(e) => {
                    tracing::debug!(?stream, error = %e, "[Reader] read error");
                    break;
                }
            }
        }
        let _ = tx.send(StreamEvent::Closed(stream));
    })
}

/// What: Terminate a child that lost the race and reap it.
///
/// Inputs:
/// - `child`: Running child process.
/// - `pid`: Its pid, captured at launch.
/// - `whole_group`: The child leads its own process group; signal every member.
///
/// Details:
/// - Sends SIGTERM first (Unix), waits up to [`TERM_GRACE`], then SIGKILL.
/// - With `whole_group`, members that outlive the leader are killed too.
/// - Always waits for the child so no zombie is left behind.
async fn terminate(child: &mut Child, pid: Option<i32>, whole_group: bool) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if whole_group {
            signal_group(pid, Signal::SIGTERM);
        } else if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            tracing::debug!(pid, error = %e, "[Runner] SIGTERM failed");
        }
        match tokio::time::timeout(TERM_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(pid, ?status, "[Runner] child exited after SIGTERM");
                if whole_group {
                    signal_group(pid, Signal::SIGKILL);
                }
                return;
            }
            Ok(Err(e)) => tracing::warn!(pid, error = %e, "[Runner] wait after SIGTERM failed"),
            Err(_) => tracing::warn!(pid, "[Runner] child ignored SIGTERM; sending SIGKILL"),
        }
        if whole_group {
            signal_group(pid, Signal::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = (pid, whole_group);
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "[Runner] failed to kill child");
    }
}

/// Signal the process group led by `pid`; an already empty group is fine.
#[cfg(unix)]
fn signal_group(pid: i32, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::unistd::Pid;

    match nix::sys::signal::killpg(Pid::from_raw(pid), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::debug!(pid, ?signal, error = %e, "[Runner] group signal failed"),
    }
}

/// What: Launch `command` and supervise it until exit, timeout, or cancellation.
///
/// Inputs:
/// - `command`: Program and leading arguments.
/// - `target`: Optional final argument (the scan path).
/// - `timeout`: Time limit for the whole run.
/// - `cancel`: Session cancel token.
/// - `sink`: Receives decoded output as it arrives.
///
/// Output:
/// - `Supervised` capture, or `RunnerError::Spawn`/`Io`.
///
/// Details:
/// - A token that is already cancelled short-circuits without launching.
/// - Once the child exited, timeout and cancellation are disarmed; pipes get
///   [`EXIT_DRAIN_GRACE`] to flush.
/// - Losing completion sources are dropped with the loop, reader tasks are aborted.
/// - `duration` runs from launch to exit (or to the abort decision); the drain
///   and termination are not counted.
/// - A child in its own process group takes its leftover descendants with it.
async fn supervise(
    command: &EngineCommand,
    target: Option<&OsStr>,
    timeout: Duration,
    cancel: &CancelToken,
    sink: &mut dyn OutputSink,
) -> Result<Supervised, RunnerError> {
    if cancel.is_cancelled() {
        tracing::info!(program = %command.program, "[Runner] cancelled before launch");
        return Ok(Supervised {
            resolution: Resolution::Aborted(AbortReason::Cancelled),
            duration: Duration::ZERO,
            stdout: String::new(),
            stderr: String::new(),
        });
    }

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args);
    if let Some(arg) = target {
        cmd.arg(arg);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    if command.own_process_group {
        cmd.process_group(0);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
        program: command.program.clone(),
        source,
    })?;
    let pid = child.id().and_then(|p| i32::try_from(p).ok());
    let whole_group = cfg!(unix) && command.own_process_group;
    tracing::info!(
        program = %command.program,
        pid = ?pid,
        timeout_ms = timeout.as_millis(),
        "[Runner] process launched"
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        readers.push(spawn_reader(out, Stream::Stdout, tx.clone()));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(spawn_reader(err, Stream::Stderr, tx.clone()));
    }
    drop(tx);
    let mut open_streams = readers.len();

    let mut out_lines = LineAssembler::new();
    let mut err_lines = LineAssembler::new();
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exited: Option<ExitStatus> = None;
    let mut exited_at: Option<Instant> = None;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let drain = tokio::time::sleep(EXIT_DRAIN_GRACE);
    tokio::pin!(drain);

    let raced: std::io::Result<Resolution> = loop {
        if open_streams == 0
            && let Some(status) = exited
        {
            break Ok(Resolution::Exited(status));
        }
        tokio::select! {
            biased;
            () = cancel.cancelled(), if exited.is_none() => {
                break Ok(Resolution::Aborted(AbortReason::Cancelled));
            }
            () = &mut deadline, if exited.is_none() => {
                break Ok(Resolution::Aborted(AbortReason::TimedOut));
            }
            status = child.wait(), if exited.is_none() => match status {
                Ok(status) => {
                    tracing::debug!(?status, "[Runner] process exited");
                    let now = Instant::now();
                    exited = Some(status);
                    exited_at = Some(now);
                    drain.as_mut().reset(now + EXIT_DRAIN_GRACE);
                }
                Err(e) => break Err(e),
            },
            event = rx.recv(), if open_streams > 0 => match event {
                Some(StreamEvent::Chunk(Stream::Stdout, bytes)) => {
                    sink.stdout_chunk();
                    for line in out_lines.push(&bytes) {
                        stdout.push_str(&line.raw);
                        stdout.push('\n');
                        sink.stdout_line(&line.text);
                    }
                }
                Some(StreamEvent::Chunk(Stream::Stderr, bytes)) => {
                    for line in err_lines.push(&bytes) {
                        stderr.push_str(&line.raw);
                        stderr.push('\n');
                        sink.stderr_line(&line.text);
                    }
                }
                Some(StreamEvent::Closed(stream)) => {
                    tracing::trace!(?stream, "[Runner] stream closed");
                    open_streams = open_streams.saturating_sub(1);
                }
                None => open_streams = 0,
            },
            () = &mut drain, if exited.is_some() && open_streams > 0 => {
                tracing::debug!("[Runner] pipes still open after exit; stop reading");
                open_streams = 0;
            }
        }
    };

    let duration = exited_at.unwrap_or_else(Instant::now).duration_since(start);
    let resolution = match raced {
        Ok(resolution) => resolution,
        Err(e) => {
            terminate(&mut child, pid, whole_group).await;
            for reader in &readers {
                reader.abort();
            }
            return Err(RunnerError::Io(e));
        }
    };

    if let Resolution::Aborted(reason) = resolution {
        tracing::info!(%reason, program = %command.program, "[Runner] terminating process");
        terminate(&mut child, pid, whole_group).await;
    } else if whole_group {
        #[cfg(unix)]
        if let Some(pid) = pid {
            signal_group(pid, nix::sys::signal::Signal::SIGKILL);
        }
    }
    for reader in &readers {
        reader.abort();
    }

    if let Some(tail) = out_lines.finish() {
        stdout.push_str(&tail.raw);
        stdout.push('\n');
        sink.stdout_line(&tail.text);
    }
    if let Some(tail) = err_lines.finish() {
        stderr.push_str(&tail.raw);
        stderr.push('\n');
        sink.stderr_line(&tail.text);
    }

    tracing::info!(
        program = %command.program,
        ?resolution,
        duration_ms = duration.as_millis(),
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "[Runner] process resolved"
    );
    Ok(Supervised {
        resolution,
        duration,
        stdout,
        stderr,
    })
}

/// What: Run the scan engine against one target and classify its output live.
///
/// Inputs:
/// - `command`: Scan engine invocation (see [`EngineCommand::scanner`]).
/// - `request`: Target, expected item count, timeout, cancel token.
/// - `reporter`: Receives progress, findings, and warnings.
///
/// Output:
/// - `Ok(ScanOutcome)` with `Completed` or `Aborted` status.
/// - `Err(RunnerError::NonZeroExit)` when the engine fails on its own.
/// - `Err(RunnerError::Spawn)` when the engine cannot be launched.
///
/// Details:
/// - A zero estimate still launches the engine.
/// - The infected count comes from the first `Infected files: N` line; a
///   missing or malformed marker yields 0 with a warning.
/// - Stderr output is reported as warnings and never changes the status.
///
/// # Errors
/// - `RunnerError::Spawn` when the engine cannot be launched.
/// - `RunnerError::NonZeroExit` when it exits on its own with a failure status.
/// - `RunnerError::Io` when waiting on the child fails.
pub async fn run_external_scan(
    command: &EngineCommand,
    request: ScanRequest<'_>,
    reporter: &dyn ProgressReporter,
) -> Result<ScanOutcome, RunnerError> {
    let label = request.target.display().to_string();
    tracing::info!(
        path = %label,
        expected = request.expected_items,
        "[Runner] scan requested"
    );
    reporter.scan_started(&label, request.expected_items);
    let mut sink = ScanSink {
        progress: ProgressState::new(request.expected_items),
        reporter,
    };
    let supervised = supervise(
        command,
        Some(request.target.as_os_str()),
        request.timeout,
        request.cancel,
        &mut sink,
    )
    .await;
    reporter.finished();
    let run = supervised?;
    let observed = sink.progress.observed_count;

    let completed = |run: Supervised| {
        let infected = parse_infected_count(&run.stdout).unwrap_or_else(|| {
            tracing::warn!(path = %label, "[Runner] no parsable 'Infected files' summary; assuming 0");
            0
        });
        tracing::info!(path = %label, infected, observed, "[Runner] scan completed");
        ScanOutcome {
            path: request.target.to_path_buf(),
            status: ScanStatus::Completed { infected },
            duration: run.duration,
            transcript: run.stdout,
            stderr: run.stderr,
        }
    };

    let resolution = run.resolution;
    match resolution {
        Resolution::Exited(status) if status.success() => Ok(completed(run)),
        Resolution::Exited(status)
            if command.infected_exit_code.is_some()
                && status.code() == command.infected_exit_code
                && has_summary(&run.stdout) =>
        {
            Ok(completed(run))
        }
        Resolution::Exited(status) => {
            tracing::warn!(path = %label, code = ?status.code(), "[Runner] scan exited with failure");
            Err(RunnerError::NonZeroExit {
                program: command.program.clone(),
                code: status.code(),
                duration: run.duration,
                transcript: run.stdout,
                stderr: run.stderr,
            })
        }
        Resolution::Aborted(reason) => {
            tracing::warn!(path = %label, %reason, observed, "[Runner] scan aborted");
            Ok(ScanOutcome {
                path: request.target.to_path_buf(),
                status: ScanStatus::Aborted(reason),
                duration: run.duration,
                transcript: run.stdout,
                stderr: run.stderr,
            })
        }
    }
}

/// What: Run the signature updater with a cosmetic heartbeat.
///
/// Inputs:
/// - `command`: Updater invocation (see [`EngineCommand::updater`]).
/// - `timeout`: Time limit.
/// - `cancel`: Session cancel token.
/// - `reporter`: Receives heartbeats and warnings.
///
/// Output:
/// - `Ok(UpdateOutcome)` for success or abort.
///
/// # Errors
/// - `RunnerError::Spawn` when the updater cannot be launched.
/// - `RunnerError::NonZeroExit` when it exits with a failure status.
pub async fn run_database_update(
    command: &EngineCommand,
    timeout: Duration,
    cancel: &CancelToken,
    reporter: &dyn ProgressReporter,
) -> Result<UpdateOutcome, RunnerError> {
    tracing::info!(command = %command.display(), "[Runner] database update requested");
    reporter.update_started();
    let mut sink = UpdateSink { reporter };
    let supervised = supervise(command, None, timeout, cancel, &mut sink).await;
    reporter.finished();
    let run = supervised?;

    match run.resolution {
        Resolution::Exited(status) if status.success() => Ok(UpdateOutcome {
            status: UpdateStatus::Updated,
            duration: run.duration,
            output: run.stdout,
            stderr: run.stderr,
        }),
        Resolution::Exited(status) => Err(RunnerError::NonZeroExit {
            program: command.display(),
            code: status.code(),
            duration: run.duration,
            transcript: run.stdout,
            stderr: run.stderr,
        }),
        Resolution::Aborted(reason) => Ok(UpdateOutcome {
            status: UpdateStatus::Aborted(reason),
            duration: run.duration,
            output: run.stdout,
            stderr: run.stderr,
        }),
    }
}
