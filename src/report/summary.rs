//! Per-target and session summary text.

use console::style;

use crate::engine::{ScanOutcome, ScanStatus};
use crate::session::SessionSummary;
use crate::util::format_secs;

/// What: Lines describing one target's outcome.
///
/// Inputs:
/// - `outcome`: Result of scanning one target.
///
/// Output:
/// - Lines ready to print, styled with `console`.
#[must_use]
pub fn target_lines(outcome: &ScanOutcome) -> Vec<String> {
    let path = outcome.path.display();
    match &outcome.status {
        ScanStatus::Completed { infected } => {
            let count = if *infected > 0 {
                style(infected.to_string()).red().bold().to_string()
            } else {
                infected.to_string()
            };
            vec![
                format!("Scan of {path} complete."),
                format!("Infected files in this directory: {count}"),
                format!("Duration: {} seconds", format_secs(outcome.duration)),
            ]
        }
        ScanStatus::Aborted(reason) => vec![
            style(format!("Scan of {path} {reason} after {} seconds.", format_secs(outcome.duration)))
                .yellow()
                .to_string(),
        ],
        ScanStatus::Failed(failure) => vec![
            style(format!("Error scanning {path}: {failure}")).red().to_string(),
            "Continuing with next directory...".to_string(),
        ],
    }
}

/// What: Lines for the end-of-session report.
///
/// Inputs:
/// - `summary`: Folded session totals.
///
/// Output:
/// - Overall summary, or a short partial report when the session was aborted.
#[must_use]
pub fn session_lines(summary: &SessionSummary) -> Vec<String> {
    if summary.aborted_early {
        let reason = summary
            .abort_reason
            .map_or_else(|| "aborted".to_string(), |r| r.to_string());
        return vec![
            style(format!("Scan {reason}.")).yellow().bold().to_string(),
            format!(
                "Before stopping: {} infected files in {} completed scan(s); {} target(s) skipped.",
                summary.total_infected, summary.completed, summary.skipped
            ),
        ];
    }
    let verdict = if summary.total_infected > 0 {
        style(format!(
            "WARNING: {} infected files found in total!",
            summary.total_infected
        ))
        .red()
        .bold()
        .to_string()
    } else {
        style("No infections found in any scanned directories.")
            .green()
            .to_string()
    };
    let mut lines = vec![
        "Overall Scan Summary:".to_string(),
        format!("Total infected files: {}", summary.total_infected),
        verdict,
        format!(
            "Total scan duration: {} seconds",
            format_secs(summary.total_duration)
        ),
    ];
    if summary.failed > 0 {
        lines.push(
            style(format!(
                "{} of {} scan(s) failed; their results are not included.",
                summary.failed,
                summary.failed + summary.completed
            ))
            .yellow()
            .to_string(),
        );
    }
    lines
}
