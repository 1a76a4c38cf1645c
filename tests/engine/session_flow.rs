//! Whole sessions driven through the production scanner with a fake engine.

use std::path::PathBuf;
use std::time::Duration;

use scanmon::engine::{AbortReason, CancelToken, ScanStatus};
use scanmon::session::{ClamScanner, run_session};

use super::support::{Recording, fake_scanner};

/// Fake engine: marks the target as scanned, fails on `bad`, hangs on `slow`.
const SCRIPT: &str = r#"touch "$1/.scanned"
case "${1##*/}" in
  bad) echo "ERROR: cannot scan" >&2; exit 2 ;;
  slow) exec sleep 30 ;;
esac
for f in "$1"/item*; do echo "Scanning $f"; done
echo "Infected files: 0""#;

/// What: Create `name` under `root` with `items` files.
fn target(root: &std::path::Path, name: &str, items: usize) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir(&dir).expect("mkdir");
    for i in 0..items {
        std::fs::write(dir.join(format!("item{i}")), b"x").expect("write");
    }
    dir
}

#[tokio::test]
/// What: A failed target does not stop the session.
///
/// Inputs:
/// - Targets `one` (2 items), `bad`, `two` (3 items).
///
/// Output:
/// - All three scanned, 2 completed, 1 failed, not aborted, progress estimate from the walk.
async fn failure_continues_session() {
    let root = tempfile::tempdir().expect("tempdir");
    let targets = vec![
        target(root.path(), "one", 2),
        target(root.path(), "bad", 1),
        target(root.path(), "two", 3),
    ];
    let reporter = Recording::default();
    let mut scanner = ClamScanner {
        command: fake_scanner(SCRIPT),
        timeout: Duration::from_secs(20),
        cancel: CancelToken::new(),
        reporter: &reporter,
    };
    let mut statuses = Vec::new();
    let summary = run_session(&targets, &mut scanner, |o| statuses.push(o.status.clone())).await;

    assert!(!summary.aborted_early);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total_infected, 0);
    assert!(matches!(statuses[1], ScanStatus::Failed(_)));
    for t in &targets {
        assert!(t.join(".scanned").exists());
    }
    assert_eq!(reporter.last_progress(), Some((3, 100)));
}

#[tokio::test]
/// What: An aborted target stops the session and later targets never run.
///
/// Inputs:
/// - Targets `one`, `slow`, `two` with a 200ms timeout.
///
/// Output:
/// - `aborted_early`, reason `TimedOut`, one target skipped and never touched.
async fn abort_skips_remaining_targets() {
    let root = tempfile::tempdir().expect("tempdir");
    let targets = vec![
        target(root.path(), "one", 1),
        target(root.path(), "slow", 1),
        target(root.path(), "two", 1),
    ];
    let reporter = Recording::default();
    let mut scanner = ClamScanner {
        command: fake_scanner(SCRIPT),
        timeout: Duration::from_millis(200),
        cancel: CancelToken::new(),
        reporter: &reporter,
    };
    let summary = run_session(&targets, &mut scanner, |_| {}).await;

    assert!(summary.aborted_early);
    assert_eq!(summary.abort_reason, Some(AbortReason::TimedOut));
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!targets[2].join(".scanned").exists());
}
