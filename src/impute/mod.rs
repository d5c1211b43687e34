//! Imputation of missing expression values.

pub mod normal;

pub use normal::{ImputeMode, ReplaceMissingFromNormal};
