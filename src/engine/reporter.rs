//! Progress reporting seam between the runner and the terminal.

/// What: Receives live progress from the runner.
///
/// Details:
/// - The terminal implementation draws `indicatif` bars; tests record events.
/// - All methods default to no-ops.
/// - Methods take `&self` so one reporter can be shared across targets.
pub trait ProgressReporter: Send + Sync {
    /// A scan of `label` starts with `expected` items estimated.
    fn scan_started(&self, _label: &str, _expected: u64) {}
    /// `observed` items examined so far; `percent` is already clamped to 100.
    fn scan_progress(&self, _observed: u64, _percent: u8) {}
    /// A positive match line, to be shown immediately.
    fn finding(&self, _line: &str) {}
    /// Text the engine wrote to standard error.
    fn warning(&self, _line: &str) {}
    /// The updater started.
    fn update_started(&self) {}
    /// The updater produced another chunk of output.
    fn heartbeat(&self) {}
    /// The current operation resolved (bars are cleared or finalised).
    fn finished(&self) {}
}

/// No-op reporter for silent operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
