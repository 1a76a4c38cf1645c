//! Scan targets: named directory groups and the item-count estimate.

/// Recursive item counting.
pub mod count;
/// Named target groups and selections.
pub mod groups;

pub use count::count_items;
pub use groups::{TargetGroup, TargetSelection};
