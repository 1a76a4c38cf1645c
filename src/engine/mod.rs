//! Scan-engine supervision: launching the external scanner and updater,
//! streaming their output, and racing exit against timeout and cancellation.

/// Cooperative cancellation token.
pub mod cancel;
/// Output line classification and summary parsing.
pub mod classify;
/// Chunk-to-line reassembly.
pub mod lines;
/// Scan and update results, runner errors.
pub mod outcome;
/// Progress reporting trait.
pub mod reporter;
/// Process launch and supervision.
pub mod runner;

pub use cancel::CancelToken;
pub use outcome::{
    AbortReason, RunnerError, ScanFailure, ScanOutcome, ScanStatus, UpdateOutcome, UpdateStatus,
};
pub use reporter::{ProgressReporter, SilentReporter};
pub use runner::{EngineCommand, ScanRequest, run_database_update, run_external_scan};
