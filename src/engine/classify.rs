//! Classification of scan-engine output lines and summary parsing.

use std::sync::LazyLock;

use regex::Regex;

/// Marker the engine prints before examining an item.
pub const EXAMINED_MARKER: &str = "Scanning";
/// Marker the engine prints on a positive match.
pub const FOUND_MARKER: &str = "FOUND";

/// `Infected files: N` summary line.
static INFECTED_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Infected files: (\d+)").ok());

/// What: Kind of a single stdout line from the scan engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// A positive match; shown to the operator immediately.
    Found,
    /// An item was examined; advances progress.
    Examined,
    /// Anything else (summary block, notices).
    Other,
}

/// What: Classify one output line.
///
/// Inputs:
/// - `line`: A complete stdout line.
///
/// Output:
/// - [`LineKind`], with `Found` taking precedence over `Examined`.
#[must_use]
pub fn classify_scan_line(line: &str) -> LineKind {
    if line.contains(FOUND_MARKER) {
        LineKind::Found
    } else if line.contains(EXAMINED_MARKER) {
        LineKind::Examined
    } else {
        LineKind::Other
    }
}

/// What: Extract the infected-file count from a scan transcript.
///
/// Inputs:
/// - `transcript`: Captured stdout text.
///
/// Output:
/// - `Some(n)` from the first `Infected files: N` marker, `None` when the
///   marker is absent or the number does not fit a `u64`.
///
/// Details:
/// - Pure; parsing the same transcript twice yields the same result.
/// - ANSI escapes in the verbatim transcript are ignored.
#[must_use]
pub fn parse_infected_count(transcript: &str) -> Option<u64> {
    let re = INFECTED_RE.as_ref()?;
    let plain = strip_ansi_escapes::strip_str(transcript);
    re.captures(&plain)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// What: Whether a transcript carries the summary marker at all.
///
/// Inputs:
/// - `transcript`: Captured stdout text.
///
/// Output:
/// - `true` when a well-formed `Infected files: N` line is present.
#[must_use]
pub fn has_summary(transcript: &str) -> bool {
    parse_infected_count(transcript).is_some()
}

/// What: Progress bookkeeping for one scan.
///
/// Details:
/// - `observed` never decreases; the displayed percentage is clamped at 100
///   while the count keeps going when the estimate was too low.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressState {
    /// Estimated number of items (seeded from the directory walk).
    pub expected_total: u64,
    /// Items reported as examined so far.
    pub observed_count: u64,
}

impl ProgressState {
    /// Start tracking against `expected_total` items.
    #[must_use]
    pub const fn new(expected_total: u64) -> Self {
        Self {
            expected_total,
            observed_count: 0,
        }
    }

    /// Record one examined item and return the new displayed percentage.
    pub fn record_examined(&mut self) -> u8 {
        self.observed_count = self.observed_count.saturating_add(1);
        self.percent()
    }

    /// What: Displayed percentage (0–100).
    ///
    /// Details:
    /// - With an estimate of zero, any observed item shows as 100%.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.expected_total == 0 {
            return if self.observed_count == 0 { 0 } else { 100 };
        }
        let pct = self.observed_count.saturating_mul(100) / self.expected_total;
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}
