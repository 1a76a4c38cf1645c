//! Scans that run to completion, fail, or cannot start.

use std::path::Path;
use std::time::Duration;

use scanmon::engine::{CancelToken, RunnerError, ScanRequest, ScanStatus, run_external_scan};

use super::support::{Event, Recording, fake_scanner};

/// Generous timeout for scans expected to finish on their own.
const LONG: Duration = Duration::from_secs(20);

#[tokio::test]
/// What: Five examined items and one match complete with the parsed count.
///
/// Inputs:
/// - Fake engine printing 5 `Scanning` lines, one `FOUND` line and `Infected files: 1`, exit 0.
///
/// Output:
/// - `Completed { infected: 1 }`, progress reaches 5 items at 100%, one finding shown.
///
/// Details:
/// - Reporter sees start, progress, finding and finish in that order.
async fn completed_scan_reports_progress_and_findings() {
    let cmd = fake_scanner(
        r#"for i in 1 2 3 4 5; do echo "Scanning $1/file$i"; done
echo "$1/file3: Eicar-Test-Signature FOUND"
echo "----------- SCAN SUMMARY -----------"
echo "Infected files: 1"
exit 0"#,
    );
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: Path::new("/srv/data"),
            expected_items: 5,
            timeout: LONG,
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");

    assert_eq!(outcome.status, ScanStatus::Completed { infected: 1 });
    assert_eq!(outcome.infected_count(), Some(1));
    assert_eq!(reporter.last_progress(), Some((5, 100)));
    assert_eq!(
        reporter.findings(),
        vec!["/srv/data/file3: Eicar-Test-Signature FOUND".to_string()]
    );
    let events = reporter.events();
    assert_eq!(events.first(), Some(&Event::Started("/srv/data".to_string(), 5)));
    assert_eq!(events.last(), Some(&Event::Finished));
    assert_eq!(outcome.transcript.lines().count(), 8);
    assert!(outcome.duration > Duration::ZERO);
}

#[tokio::test]
/// What: Standard error output becomes warnings without affecting the status.
///
/// Inputs:
/// - Fake engine writing one stderr line and a clean summary, exit 0.
///
/// Output:
/// - `Completed { infected: 0 }` with the stderr line reported and captured.
async fn stderr_lines_are_warnings_only() {
    let cmd = fake_scanner(
        r#"echo "Scanning $1/a"
echo "LibClamAV Warning: odd file" >&2
echo "Infected files: 0""#,
    );
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: Path::new("/tmp"),
            expected_items: 1,
            timeout: LONG,
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");
    assert_eq!(outcome.status, ScanStatus::Completed { infected: 0 });
    assert_eq!(reporter.warnings(), vec!["LibClamAV Warning: odd file".to_string()]);
    assert!(outcome.stderr.contains("odd file"));
}

#[tokio::test]
/// What: A missing summary yields zero infected files and a zero estimate still scans.
///
/// Inputs:
/// - Fake engine printing two `Scanning` lines and no summary; expected items 0.
///
/// Output:
/// - `Completed { infected: 0 }`, progress shows 100% once anything was examined.
async fn missing_summary_counts_as_zero() {
    let cmd = fake_scanner(r#"echo "Scanning $1/a"; echo "Scanning $1/b""#);
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: Path::new("/tmp"),
            expected_items: 0,
            timeout: LONG,
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");
    assert_eq!(outcome.status, ScanStatus::Completed { infected: 0 });
    assert_eq!(reporter.last_progress(), Some((2, 100)));
}

#[tokio::test]
/// What: A non-zero exit surfaces as `NonZeroExit` with the code and captured text.
///
/// Inputs:
/// - Fake engine printing a line and exiting with 2.
///
/// Output:
/// - `Err(RunnerError::NonZeroExit { code: Some(2), .. })` with the transcript kept.
async fn non_zero_exit_is_an_error() {
    let cmd = fake_scanner(r#"echo "Scanning $1/a"; echo "ERROR: broken" >&2; exit 2"#);
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let err = run_external_scan(
        &cmd,
        ScanRequest {
            target: Path::new("/tmp"),
            expected_items: 1,
            timeout: LONG,
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect_err("non-zero exit");
    assert_eq!(err.exit_code(), Some(2));
    match err {
        RunnerError::NonZeroExit {
            transcript, stderr, ..
        } => {
            assert_eq!(transcript, "Scanning /tmp/a\n");
            assert_eq!(stderr, "ERROR: broken\n");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
/// What: The configured detection exit code completes only when a summary is present.
///
/// Inputs:
/// - Fake engine exiting 1 with `Infected files: 1`; the same without a summary.
///
/// Output:
/// - `Completed { infected: 1 }` when `infected_exit_code = Some(1)`; errors otherwise.
async fn infected_exit_code_is_opt_in() {
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let request = ScanRequest {
        target: Path::new("/tmp"),
        expected_items: 1,
        timeout: LONG,
        cancel: &cancel,
    };
    let with_summary = r#"echo "/tmp/x: Eicar FOUND"; echo "Infected files: 1"; exit 1"#;

    let opted_in = fake_scanner(with_summary).with_infected_exit_code(Some(1));
    let outcome = run_external_scan(&opted_in, request, &reporter)
        .await
        .expect("scan");
    assert_eq!(outcome.status, ScanStatus::Completed { infected: 1 });

    let default = fake_scanner(with_summary);
    let err = run_external_scan(&default, request, &reporter)
        .await
        .expect_err("non-zero exit");
    assert_eq!(err.exit_code(), Some(1));

    let no_summary = fake_scanner("exit 1").with_infected_exit_code(Some(1));
    assert!(run_external_scan(&no_summary, request, &reporter).await.is_err());
}

#[tokio::test]
/// What: A binary that cannot be launched surfaces `RunnerError::Spawn`.
///
/// Inputs:
/// - Program path that does not exist.
///
/// Output:
/// - `Err(Spawn)` naming the program; the reporter is still finished.
async fn spawn_failure_is_reported() {
    let mut cmd = fake_scanner("exit 0");
    cmd.program = "/nonexistent/scanmon-clamscan".to_string();
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let err = run_external_scan(
        &cmd,
        ScanRequest {
            target: Path::new("/tmp"),
            expected_items: 0,
            timeout: LONG,
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect_err("spawn failure");
    match err {
        RunnerError::Spawn { program, .. } => assert_eq!(program, "/nonexistent/scanmon-clamscan"),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(reporter.events().last(), Some(&Event::Finished));
}

#[tokio::test]
/// What: Target paths with shell metacharacters are passed as one inert argument.
///
/// Inputs:
/// - Target `/tmp/a b;touch x` echoed back by the fake engine.
///
/// Output:
/// - The transcript contains the path verbatim.
async fn target_is_a_single_argument() {
    let cmd = fake_scanner(r#"echo "Scanning [$1]"; echo "Infected files: 0""#);
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: Path::new("/tmp/a b;touch x"),
            expected_items: 1,
            timeout: LONG,
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");
    assert!(outcome.transcript.contains("Scanning [/tmp/a b;touch x]"));
}

#[tokio::test]
/// What: Coloured CRLF output is matched as plain text but kept verbatim in the transcript.
///
/// Inputs:
/// - Fake engine printing a CRLF `Scanning` line, a red `FOUND` line and a summary.
///
/// Output:
/// - `Completed { infected: 1 }`, a plain finding, and a transcript holding the
///   escape codes and carriage returns exactly as printed.
async fn transcript_keeps_output_verbatim() {
    let cmd = fake_scanner(
        r"printf 'Scanning %s/a\r\n\033[31m%s/a: Eicar FOUND\033[0m\r\nInfected files: 1\r\n' $1 $1",
    );
    let cancel = CancelToken::new();
    let reporter = Recording::default();
    let outcome = run_external_scan(
        &cmd,
        ScanRequest {
            target: Path::new("/srv/data"),
            expected_items: 1,
            timeout: LONG,
            cancel: &cancel,
        },
        &reporter,
    )
    .await
    .expect("scan");

    assert_eq!(outcome.status, ScanStatus::Completed { infected: 1 });
    assert_eq!(reporter.findings(), vec!["/srv/data/a: Eicar FOUND".to_string()]);
    assert_eq!(reporter.last_progress(), Some((1, 100)));
    assert_eq!(
        outcome.transcript,
        "Scanning /srv/data/a\r\n\u{1b}[31m/srv/data/a: Eicar FOUND\u{1b}[0m\r\nInfected files: 1\r\n"
    );
}
