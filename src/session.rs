//! Session aggregation: scan targets in order and fold their outcomes.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{
    AbortReason, CancelToken, EngineCommand, ProgressReporter, RunnerError, ScanOutcome,
    ScanRequest, ScanStatus, run_external_scan,
};
use crate::targets::count_items;

/// What: Totals accumulated across one session.
///
/// Details:
/// - `total_infected` sums completed outcomes only.
/// - `total_duration` sums completed and failed outcomes; the aborting outcome
///   is not added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Infected files over all completed scans.
    pub total_infected: u64,
    /// Scan time over all completed and failed scans.
    pub total_duration: Duration,
    /// Set once an outcome was aborted; later targets were skipped.
    pub aborted_early: bool,
    /// Why the session stopped early.
    pub abort_reason: Option<AbortReason>,
    /// Number of completed scans.
    pub completed: usize,
    /// Number of failed scans.
    pub failed: usize,
    /// Targets never handed to the scanner.
    pub skipped: usize,
}

impl SessionSummary {
    /// What: Fold one outcome into the summary.
    ///
    /// Inputs:
    /// - `outcome`: Result for the next target in selection order.
    ///
    /// Output:
    /// - `true` when the session may continue, `false` once it was aborted.
    pub fn record(&mut self, outcome: &ScanOutcome) -> bool {
        match &outcome.status {
            ScanStatus::Completed { infected } => {
                self.total_infected = self.total_infected.saturating_add(*infected);
                self.total_duration += outcome.duration;
                self.completed += 1;
                true
            }
            ScanStatus::Failed(_) => {
                self.total_duration += outcome.duration;
                self.failed += 1;
                true
            }
            ScanStatus::Aborted(reason) => {
                self.aborted_early = true;
                self.abort_reason = Some(*reason);
                false
            }
        }
    }
}

/// What: Something that can scan one target.
///
/// Details:
/// - The production implementation is [`ClamScanner`]; tests script outcomes.
pub trait TargetScanner {
    /// Scan `target` and report how it resolved.
    fn scan(&mut self, target: &Path) -> impl Future<Output = Result<ScanOutcome, RunnerError>>;
}

/// What: Scan every target in order and aggregate the results.
///
/// Inputs:
/// - `targets`: Paths in selection order.
/// - `scanner`: Performs each scan.
/// - `on_outcome`: Called with every outcome (including failures) as it arrives.
///
/// Output:
/// - Final [`SessionSummary`].
///
/// Details:
/// - Runner errors become `Failed` outcomes and the session continues.
/// - The first aborted outcome stops the loop; remaining targets are counted
///   as skipped and never reach the scanner.
pub async fn run_session<S, F>(targets: &[PathBuf], scanner: &mut S, mut on_outcome: F) -> SessionSummary
where
    S: TargetScanner,
    F: FnMut(&ScanOutcome),
{
    let mut summary = SessionSummary::default();
    tracing::info!(targets = targets.len(), "[Session] starting");
    for (idx, target) in targets.iter().enumerate() {
        let outcome = match scanner.scan(target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(path = %target.display(), error = %e, "[Session] scan failed; continuing");
                ScanOutcome::from_error(target.clone(), &e)
            }
        };
        on_outcome(&outcome);
        if !summary.record(&outcome) {
            summary.skipped = targets.len() - idx - 1;
            tracing::warn!(
                path = %target.display(),
                skipped = summary.skipped,
                "[Session] aborted; skipping remaining targets"
            );
            break;
        }
    }
    tracing::info!(
        infected = summary.total_infected,
        completed = summary.completed,
        failed = summary.failed,
        aborted = summary.aborted_early,
        "[Session] finished"
    );
    summary
}

/// What: Production scanner: estimate items, then run the engine.
pub struct ClamScanner<'a> {
    /// Engine invocation.
    pub command: EngineCommand,
    /// Per-target timeout.
    pub timeout: Duration,
    /// Session cancel token.
    pub cancel: CancelToken,
    /// Live progress sink.
    pub reporter: &'a dyn ProgressReporter,
}

impl TargetScanner for ClamScanner<'_> {
    async fn scan(&mut self, target: &Path) -> Result<ScanOutcome, RunnerError> {
        let expected_items = estimate_items(target).await;
        run_external_scan(
            &self.command,
            ScanRequest {
                target,
                expected_items,
                timeout: self.timeout,
                cancel: &self.cancel,
            },
            self.reporter,
        )
        .await
    }
}

/// What: Count items off the async runtime, falling back to 0.
///
/// Inputs:
/// - `target`: Path about to be scanned.
///
/// Output:
/// - Item estimate; 0 when counting failed (the scan still runs).
pub async fn estimate_items(target: &Path) -> u64 {
    let owned = target.to_path_buf();
    match tokio::task::spawn_blocking(move || count_items(&owned)).await {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            tracing::warn!(path = %target.display(), error = %e, "[Session] could not count items; progress will be approximate");
            0
        }
        Err(e) => {
            tracing::warn!(path = %target.display(), error = %e, "[Session] counting task failed");
            0
        }
    }
}
