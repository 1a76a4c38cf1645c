//! Signature updater runs.

use std::time::Duration;

use scanmon::engine::{AbortReason, CancelToken, UpdateStatus, run_database_update};

use super::support::{Event, Recording, fake_updater};

#[tokio::test]
/// What: A successful updater run reports heartbeats and keeps its output.
///
/// Inputs:
/// - Fake updater printing three lines with pauses, exit 0.
///
/// Output:
/// - `Updated`, at least one heartbeat, output captured, update start and finish reported.
async fn successful_update_beats() {
    let cmd = fake_updater(
        "echo 'daily.cvd updated'; sleep 0.05; echo 'main.cvd is up to date'; sleep 0.05; echo 'bytecode.cvd is up to date'",
    );
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_database_update(&cmd, Duration::from_secs(20), &cancel, &reporter)
        .await
        .expect("update");
    assert_eq!(outcome.status, UpdateStatus::Updated);
    assert_eq!(outcome.output.lines().count(), 3);
    let events = reporter.events();
    assert_eq!(events.first(), Some(&Event::UpdateStarted));
    assert!(events.contains(&Event::Heartbeat));
    assert_eq!(events.last(), Some(&Event::Finished));
}

#[tokio::test]
/// What: A failing updater surfaces `NonZeroExit` with its stderr.
///
/// Inputs:
/// - Fake updater writing to stderr and exiting 1.
///
/// Output:
/// - `Err` with exit code 1 and the stderr text reported as a warning.
async fn failing_update_is_an_error() {
    let cmd = fake_updater("echo 'Can not connect to mirror' >&2; exit 1");
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let err = run_database_update(&cmd, Duration::from_secs(20), &cancel, &reporter)
        .await
        .expect_err("failure");
    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(reporter.warnings(), vec!["Can not connect to mirror".to_string()]);
}

#[tokio::test]
/// What: A hanging updater is aborted by its timeout.
///
/// Inputs:
/// - Fake updater sleeping 30 s, timeout 100ms.
///
/// Output:
/// - `Aborted(TimedOut)` well before the sleep ends.
async fn hanging_update_times_out() {
    let cmd = fake_updater("exec sleep 30");
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_database_update(&cmd, Duration::from_millis(100), &cancel, &reporter)
        .await
        .expect("update");
    assert_eq!(outcome.status, UpdateStatus::Aborted(AbortReason::TimedOut));
    assert!(outcome.duration < Duration::from_secs(5));
}
