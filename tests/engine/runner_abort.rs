//! Timeouts and cancellation terminate the engine and report an abort.

use std::path::Path;
use std::time::{Duration, Instant};

use scanmon::engine::{AbortReason, CancelToken, ScanRequest, ScanStatus, run_external_scan};

use super::support::{Event, Recording, fake_scanner};

/// What: Script that records its pid in `pid_file` and never exits on its own.
fn endless(pid_file: &Path) -> String {
    format!(
        "echo \"Scanning $1/first\"; echo $$ > '{}'; exec sleep 30",
        pid_file.display()
    )
}

/// Read the pid written by [`endless`].
fn read_pid(pid_file: &Path) -> i32 {
    std::fs::read_to_string(pid_file)
        .expect("pid file")
        .trim()
        .parse()
        .expect("pid")
}

#[tokio::test]
/// What: A never-ending engine is aborted by the timeout and terminated.
///
/// Inputs:
/// - Endless fake engine, timeout 100ms.
///
/// Output:
/// - `Aborted(TimedOut)` within 500ms, no infected count, and the process is gone.
async fn timeout_aborts_and_terminates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("pid");
    let cmd = fake_scanner(&endless(&pid_file));
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let started = Instant::now();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: dir.path(),
            expected_items: 10,
            timeout: Duration::from_millis(100),
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");
    let elapsed = started.elapsed();

    assert_eq!(outcome.status, ScanStatus::Aborted(AbortReason::TimedOut));
    assert_eq!(outcome.infected_count(), None);
    assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
    assert!(outcome.duration >= Duration::from_millis(100));
    #[cfg(unix)]
    assert!(!super::support::process_exists(read_pid(&pid_file)));
    assert_eq!(reporter.events().last(), Some(&Event::Finished));
}

#[tokio::test]
/// What: Cancelling mid-scan aborts promptly with the elapsed time recorded.
///
/// Inputs:
/// - Endless fake engine, long timeout, cancel fired after 50ms.
///
/// Output:
/// - `Aborted(Cancelled)`, duration of roughly 50ms, process gone.
async fn cancel_aborts_promptly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("pid");
    let cmd = fake_scanner(&endless(&pid_file));
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: dir.path(),
            expected_items: 10,
            timeout: Duration::from_secs(30),
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");

    assert_eq!(outcome.status, ScanStatus::Aborted(AbortReason::Cancelled));
    assert!(outcome.duration >= Duration::from_millis(40), "took {:?}", outcome.duration);
    assert!(outcome.duration < Duration::from_millis(1000), "took {:?}", outcome.duration);
    #[cfg(unix)]
    assert!(!super::support::process_exists(read_pid(&pid_file)));
}

#[tokio::test]
/// What: An already-cancelled token never launches the engine.
///
/// Inputs:
/// - Fake engine that would create a marker file; token cancelled beforehand.
///
/// Output:
/// - `Aborted(Cancelled)` with zero duration and no marker file.
async fn pre_cancelled_token_skips_launch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("ran");
    let cmd = fake_scanner(&format!("touch '{}'", marker.display()));
    let cancel = CancelToken::new();
    cancel.cancel();
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: dir.path(),
            expected_items: 0,
            timeout: Duration::from_secs(5),
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");
    assert_eq!(outcome.status, ScanStatus::Aborted(AbortReason::Cancelled));
    assert_eq!(outcome.duration, Duration::ZERO);
    assert!(!marker.exists());
}

#[tokio::test]
/// What: A child ignoring SIGTERM is killed after the grace period.
///
/// Inputs:
/// - Fake engine trapping TERM and looping; timeout 100ms.
///
/// Output:
/// - `Aborted(TimedOut)` and the process is gone afterwards.
async fn stubborn_child_is_killed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("pid");
    let cmd = fake_scanner(&format!(
        "trap '' TERM; echo $$ > '{}'; while :; do sleep 1; done",
        pid_file.display()
    ));
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: dir.path(),
            expected_items: 0,
            timeout: Duration::from_millis(100),
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");
    assert_eq!(outcome.status, ScanStatus::Aborted(AbortReason::TimedOut));
    #[cfg(unix)]
    assert!(!super::support::process_exists(read_pid(&pid_file)));
}

#[cfg(unix)]
#[tokio::test]
/// What: Aborting a forking engine also terminates the processes it started.
///
/// Inputs:
/// - Fake engine that backgrounds `sleep 30`, records its pid and waits; timeout 200ms.
///
/// Output:
/// - `Aborted(TimedOut)` and the background process is gone.
async fn abort_terminates_engine_descendants() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("gpid");
    let cmd = fake_scanner(&format!(
        "sleep 30 & echo $! > '{}'; echo \"Scanning $1/a\"; wait",
        pid_file.display()
    ));
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: dir.path(),
            expected_items: 1,
            timeout: Duration::from_millis(200),
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");
    assert_eq!(outcome.status, ScanStatus::Aborted(AbortReason::TimedOut));
    let descendant = read_pid(&pid_file);
    assert!(
        !super::support::still_running(descendant).await,
        "pid {descendant} survived the abort"
    );
}

#[cfg(unix)]
#[tokio::test]
/// What: A cancel arriving after the engine exited keeps the completed result.
///
/// Inputs:
/// - Fake engine that exits 0 with a summary while a background child keeps
///   stdout open; cancel fired 100ms in, inside the post-exit drain.
///
/// Output:
/// - `Completed { infected: 0 }`, duration measured to the exit rather than
///   the end of the drain, and the background child cleaned up.
async fn cancel_after_exit_keeps_completion() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("gpid");
    let cmd = fake_scanner(&format!(
        "sleep 2 & echo $! > '{}'; echo 'Infected files: 0'; exit 0",
        pid_file.display()
    ));
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: dir.path(),
            expected_items: 0,
            timeout: Duration::from_secs(10),
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");
    assert!(cancel.is_cancelled());
    assert_eq!(outcome.status, ScanStatus::Completed { infected: 0 });
    assert!(outcome.duration < Duration::from_millis(200), "took {:?}", outcome.duration);
    let descendant = read_pid(&pid_file);
    assert!(!super::support::still_running(descendant).await);
}
