//! Operations driven by column groupings.

pub mod average;
pub mod template;

pub use average::{AverageGroups, GroupSummary};
pub use template::GroupingFromTemplate;
