//! The annotated data matrix and its column families.

mod annotation;
pub mod cell;
mod document;
mod expression;
mod family;
mod matrix;
mod summary;

pub use annotation::{check_disjoint, partition_groups};
pub use cell::{categories, Categories};
pub use document::Document;
pub use expression::ExpressionBlock;
pub use family::{ColumnFamily, Family, FamilyParts};
pub use matrix::{AnnotatedMatrix, MatrixParts};
pub use summary::MatrixSummary;
