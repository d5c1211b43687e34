//! Shape summary of an annotated matrix.

use crate::data::cell::is_valid;
use crate::data::matrix::AnnotatedMatrix;
use serde::Serialize;

/// Counts per family plus missing and imputed expression cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixSummary {
    pub name: String,
    pub origin: String,
    pub rows: usize,
    pub expression_columns: usize,
    pub numeric_columns: usize,
    pub category_columns: usize,
    pub text_columns: usize,
    pub multi_numeric_columns: usize,
    pub category_rows: usize,
    pub numeric_rows: usize,
    pub missing_values: usize,
    pub imputed_values: usize,
    pub has_quality: bool,
}

impl MatrixSummary {
    /// Fraction of expression cells that are not finite.
    pub fn missing_fraction(&self) -> f64 {
        let cells = self.rows * self.expression_columns;
        if cells == 0 {
            0.0
        } else {
            self.missing_values as f64 / cells as f64
        }
    }
}

impl AnnotatedMatrix {
    /// Summarize the matrix shape.
    pub fn summary(&self) -> MatrixSummary {
        let block = self.expression_block();
        let missing_values = block.values_view().iter().filter(|&&v| !is_valid(v)).count();
        let imputed_values = block
            .imputed_view()
            .map(|m| m.iter().filter(|&&b| b).count())
            .unwrap_or(0);
        MatrixSummary {
            name: self.name().to_string(),
            origin: self.origin().to_string(),
            rows: self.row_count(),
            expression_columns: self.expression_column_count(),
            numeric_columns: self.numeric_columns().len(),
            category_columns: self.category_columns().len(),
            text_columns: self.text_columns().len(),
            multi_numeric_columns: self.multi_numeric_columns().len(),
            category_rows: self.category_rows().len(),
            numeric_rows: self.numeric_rows().len(),
            missing_values,
            imputed_values,
            has_quality: self.has_quality(),
        }
    }
}

impl std::fmt::Display for MatrixSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.name.is_empty() {
            writeln!(f, "Name:               {}", self.name)?;
        }
        if !self.origin.is_empty() {
            writeln!(f, "Origin:             {}", self.origin)?;
        }
        writeln!(f, "Rows:               {}", self.rows)?;
        writeln!(f, "Expression columns: {}", self.expression_columns)?;
        writeln!(f, "Numeric columns:    {}", self.numeric_columns)?;
        writeln!(f, "Category columns:   {}", self.category_columns)?;
        writeln!(f, "Text columns:       {}", self.text_columns)?;
        writeln!(f, "Multi-numeric:      {}", self.multi_numeric_columns)?;
        writeln!(f, "Category rows:      {}", self.category_rows)?;
        writeln!(f, "Numeric rows:       {}", self.numeric_rows)?;
        writeln!(
            f,
            "Missing values:     {} ({:.1}%)",
            self.missing_values,
            100.0 * self.missing_fraction()
        )?;
        writeln!(f, "Imputed values:     {}", self.imputed_values)?;
        Ok(())
    }
}
