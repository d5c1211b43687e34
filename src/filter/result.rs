//! Bookkeeping shared by the row filters.

use crate::data::AnnotatedMatrix;
use crate::error::Result;

/// Statistics about what a filter removed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    /// Number of rows before filtering.
    pub n_before: usize,
    /// Number of rows after filtering.
    pub n_after: usize,
    /// Number of rows removed.
    pub n_removed: usize,
    /// Proportion of rows retained.
    pub retention_rate: f64,
}

impl std::fmt::Display for FilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Filter Result")?;
        writeln!(f, "  Before:    {} rows", self.n_before)?;
        writeln!(f, "  After:     {} rows", self.n_after)?;
        writeln!(f, "  Removed:   {} rows", self.n_removed)?;
        writeln!(f, "  Retained:  {:.1}%", self.retention_rate * 100.0)?;
        Ok(())
    }
}

/// Keep the rows in `keep` and report what changed.
pub fn keep_rows(matrix: &mut AnnotatedMatrix, keep: &[usize]) -> Result<FilterResult> {
    let n_before = matrix.row_count();
    matrix.extract_expression_rows(keep)?;
    let n_after = matrix.row_count();
    let result = FilterResult {
        n_before,
        n_after,
        n_removed: n_before - n_after,
        retention_rate: if n_before == 0 {
            1.0
        } else {
            n_after as f64 / n_before as f64
        },
    };
    log::info!(
        "Kept {} of {} rows ({:.1}%)",
        n_after,
        n_before,
        result.retention_rate * 100.0
    );
    Ok(result)
}
