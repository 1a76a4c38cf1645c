//! Command-line argument parsing and handling.

pub mod definition;
pub mod utils;

pub use definition::Args;
pub use utils::{app_options, determine_log_level};
