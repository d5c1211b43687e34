//! Value transformations of the expression block.
//!
//! - **Z-score**: per-row or per-column standardization
//! - **Log**: logarithm to an arbitrary base

pub mod logarithm;
pub mod zscore;

pub use logarithm::LogTransform;
pub use zscore::{standardize, Axis, ZScore};
