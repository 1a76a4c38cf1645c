//! Terminal presentation: live progress and end-of-run summaries.

/// `indicatif` progress reporter.
pub mod progress;
/// Summary text.
pub mod summary;

pub use progress::TerminalReporter;
pub use summary::{session_lines, target_lines};
