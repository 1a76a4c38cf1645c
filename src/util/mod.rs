//! Small utility helpers shared by the configuration loader and the report layer.

pub mod config;

use std::time::Duration;

/// What: Render a duration as fractional seconds with two decimals.
///
/// Inputs:
/// - `duration`: Elapsed time to render.
///
/// Output:
/// - String such as `"12.34"` (no unit suffix).
///
/// Details:
/// - Matches the precision operators see in the per-target and session summaries.
#[must_use]
pub fn format_secs(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64())
}

/// What: Interpret a lenient boolean configuration value.
///
/// Inputs:
/// - `val`: Raw value from a `key = value` line.
///
/// Output:
/// - `Some(true)`/`Some(false)` for recognised spellings, `None` otherwise.
#[must_use]
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
