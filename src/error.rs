//! Error types for the perseus-plugins library.

use crate::data::Family;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File '{0}' does not exist")]
    FileNotFound(String),

    #[error("Dimension mismatch in {family} family: expected {expected}, got {actual}")]
    DimensionMismatch {
        family: Family,
        expected: usize,
        actual: usize,
    },

    #[error("Index {index} out of range for {family} family of length {len}")]
    IndexOutOfRange {
        family: Family,
        index: usize,
        len: usize,
    },

    #[error("Column '{name}' already exists in the {family} family")]
    DuplicateName { family: Family, name: String },

    #[error("Column {0} is selected more than once")]
    AmbiguousSelection(usize),

    #[error("Column name '{0}' occurs more than once in the selection")]
    DuplicateColumnName(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("{0}")]
    Transform(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, MatrixError>;
