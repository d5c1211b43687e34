//! Annotated Data Matrix Library for Proteomics Workbenches
//!
//! This library provides the annotated data matrix used by quantitative
//! proteomics tools, a loader and writer for its tab-separated file format,
//! and composable transforms over it.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: The annotated matrix, its column families and row annotations
//! - **io**: Tabular loading with column selection, writing and grouping templates
//! - **filter**: Row filters (valid values, random subsets, column values)
//! - **normalize**: Value transformations (logarithm, z-score)
//! - **impute**: Replacement of missing values from a normal distribution
//! - **group**: Groupings from templates and group averaging
//! - **test**: Two-sample testing between groups
//! - **combine**: Matching rows against a second matrix
//! - **pipeline**: Pipeline composition and execution
//!
//! # Example
//!
//! ```no_run
//! use perseus_plugins::prelude::*;
//! use std::path::Path;
//!
//! let loader = TabularLoader::new(LoadOptions::default());
//! let mut info = ProcessInfo::new();
//! let matrix = loader
//!     .load_inferred(Path::new("proteinGroups.txt"), &mut info)
//!     .unwrap();
//!
//! let output = Pipeline::new()
//!     .log2()
//!     .filter_valid_values(3)
//!     .impute_normal(0)
//!     .two_sample_test("Condition", "treated", "control")
//!     .run(&matrix, &mut info)
//!     .unwrap();
//!
//! write_matrix(&output.matrix, Path::new("result.txt")).unwrap();
//! ```

pub mod combine;
pub mod data;
pub mod error;
pub mod filter;
pub mod group;
pub mod impute;
pub mod io;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod test;
pub mod transform;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::combine::MatchRowsByName;
    pub use crate::data::{
        categories, AnnotatedMatrix, Categories, ColumnFamily, Document, Family, MatrixParts,
        MatrixSummary,
    };
    pub use crate::error::{MatrixError, Result};
    pub use crate::filter::{
        keep_rows, FilterCategoricalColumn, FilterNumericColumn, FilterRandomRows, FilterResult,
        FilterValidValues, MatchMode, ValidValuesMode,
    };
    pub use crate::group::{AverageGroups, GroupSummary, GroupingFromTemplate};
    pub use crate::impute::{ImputeMode, ReplaceMissingFromNormal};
    pub use crate::io::{
        read_grouping_template, write_grouping_template, write_matrix, ColumnSelection,
        FileHeader, LoadOptions, TabularLoader,
    };
    pub use crate::normalize::{Axis, LogTransform, ZScore};
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineOutput, PipelineStep};
    pub use crate::progress::ProcessInfo;
    pub use crate::test::{welch_t_test, TwoSampleTest};
    pub use crate::transform::{run_transform, Transform, TransformDescriptor, TransformOutput};
}
