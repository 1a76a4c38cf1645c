//! Terminal progress display for scans and updates.

use std::sync::Mutex;
use std::time::Duration;

use console::{Term, style};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::engine::ProgressReporter;

/// Scan bar layout: percentage position, item counter in the message.
const SCAN_TEMPLATE: &str = "Scanning: [{bar:40.cyan/blue}] {pos:>3}% | {msg}";
/// Spinner layout used while the updater runs.
const UPDATE_TEMPLATE: &str = "{spinner:.green} {msg} [{elapsed}]";
/// Spinner redraw interval.
const SPINNER_TICK: Duration = Duration::from_millis(120);

/// Bar currently on screen.
struct Active {
    /// The indicatif handle.
    bar: ProgressBar,
    /// Estimated item count for the message.
    expected: u64,
}

/// What: `ProgressReporter` drawing `indicatif` bars on stderr.
///
/// Details:
/// - Bars are hidden when stderr is not a terminal; findings and warnings are
///   still printed.
/// - Findings are printed above the bar in red as they arrive.
pub struct TerminalReporter {
    /// Current bar, if any.
    active: Mutex<Option<Active>>,
    /// Whether bars should be drawn.
    draw: bool,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    /// Reporter that draws only when stderr is a terminal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
            draw: Term::stderr().is_term(),
        }
    }

    /// Draw target for new bars.
    fn target(&self) -> ProgressDrawTarget {
        if self.draw {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        }
    }

    /// Replace the active bar, clearing any previous one.
    fn replace(&self, next: Option<Active>) {
        if let Ok(mut guard) = self.active.lock() {
            if let Some(prev) = guard.take() {
                prev.bar.finish_and_clear();
            }
            *guard = next;
        }
    }

    /// Print a line above the bar (or directly when no bar is shown).
    fn print_line(&self, text: &str) {
        if self.draw
            && let Ok(guard) = self.active.lock()
            && let Some(active) = guard.as_ref()
        {
            active.bar.println(text);
            return;
        }
        eprintln!("{text}");
    }
}

impl ProgressReporter for TerminalReporter {
    fn scan_started(&self, label: &str, expected: u64) {
        println!("Scanning {label} ({expected} items estimated)");
        let bar = ProgressBar::with_draw_target(Some(100), self.target());
        bar.set_style(
            ProgressStyle::with_template(SCAN_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(format!("0/{expected} items"));
        self.replace(Some(Active { bar, expected }));
    }

    fn scan_progress(&self, observed: u64, percent: u8) {
        if let Ok(guard) = self.active.lock()
            && let Some(active) = guard.as_ref()
        {
            active.bar.set_position(u64::from(percent));
            active
                .bar
                .set_message(format!("{observed}/{} items", active.expected));
        }
    }

    fn finding(&self, line: &str) {
        self.print_line(&style(line).red().bold().to_string());
    }

    fn warning(&self, line: &str) {
        self.print_line(&style(format!("warning: {line}")).yellow().to_string());
    }

    fn update_started(&self) {
        println!("Updating ClamAV database...");
        let bar = ProgressBar::with_draw_target(None, self.target());
        bar.set_style(
            ProgressStyle::with_template(UPDATE_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Waiting for updater output");
        bar.enable_steady_tick(SPINNER_TICK);
        self.replace(Some(Active { bar, expected: 0 }));
    }

    fn heartbeat(&self) {
        if let Ok(guard) = self.active.lock()
            && let Some(active) = guard.as_ref()
        {
            active.bar.set_message("Receiving updates");
            active.bar.tick();
        }
    }

    fn finished(&self) {
        self.replace(None);
    }
}
