//! Row filters.

pub mod column;
pub mod random;
mod result;
pub mod valid_values;

pub use column::{FilterCategoricalColumn, FilterNumericColumn, MatchMode};
pub use random::FilterRandomRows;
pub use result::{keep_rows, FilterResult};
pub use valid_values::{FilterValidValues, ValidValuesMode};
