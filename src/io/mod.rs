//! Reading and writing annotated matrices as delimited text.

mod loader;
mod writer;

pub use loader::{ColumnSelection, FileHeader, LoadOptions, TabularLoader};
pub use writer::{
    read_grouping_template, write_grouping_template, write_matrix, write_matrix_to,
    GroupingTemplate, DEFAULT_GROUPING_NAME,
};
