//! Library entry for scanmon: drives an external antivirus engine with live
//! progress, timeouts and cancellation, and aggregates a session summary.

pub mod app;
pub mod database;
pub mod engine;
pub mod paths;
pub mod prompt;
pub mod report;
pub mod session;
pub mod settings;
pub mod setup;
pub mod targets;
pub mod util;
