//! Filtering rows on the values of a categorical or numeric column.

use crate::data::AnnotatedMatrix;
use crate::error::{MatrixError, Result};
use crate::filter::result::keep_rows;
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformOutput};
use serde::{Deserialize, Serialize};

/// What happens to matching rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    Keep,
    Remove,
}

/// Keep or remove rows whose category set contains any of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCategoricalColumn {
    pub column: String,
    pub values: Vec<String>,
    pub mode: MatchMode,
}

impl FilterCategoricalColumn {
    fn column_index(&self, matrix: &AnnotatedMatrix) -> Result<usize> {
        matrix
            .category_columns()
            .index_of(&self.column)
            .ok_or_else(|| MatrixError::MissingColumn(self.column.clone()))
    }
}

impl Transform for FilterCategoricalColumn {
    fn name(&self) -> &'static str {
        "Filter rows based on categorical column"
    }

    fn validate(&self, matrix: &AnnotatedMatrix) -> Result<()> {
        let index = self.column_index(matrix)?;
        let present = matrix
            .category_column_view(index)
            .iter()
            .any(|cell| self.values.iter().any(|v| cell.contains(v)));
        if !present {
            return Err(MatrixError::Transform(format!(
                "None of the values {:?} occur in column '{}'",
                self.values, self.column
            )));
        }
        Ok(())
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        _info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        self.validate(matrix)?;
        let index = self.column_index(matrix)?;
        let keep: Vec<usize> = matrix
            .category_column_view(index)
            .iter()
            .enumerate()
            .filter(|(_, cell)| {
                let matches = self.values.iter().any(|v| cell.contains(v));
                matches == (self.mode == MatchMode::Keep)
            })
            .map(|(row, _)| row)
            .collect();
        keep_rows(matrix, &keep)?;
        Ok(TransformOutput::default())
    }
}

/// Keep rows whose numeric value lies in `[min, max]`. Missing bounds are open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterNumericColumn {
    pub column: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FilterNumericColumn {
    fn column_index(&self, matrix: &AnnotatedMatrix) -> Result<usize> {
        matrix
            .numeric_columns()
            .index_of(&self.column)
            .ok_or_else(|| MatrixError::MissingColumn(self.column.clone()))
    }

    fn accepts(&self, value: f64) -> bool {
        !value.is_nan()
            && self.min.map_or(true, |min| value >= min)
            && self.max.map_or(true, |max| value <= max)
    }
}

impl Transform for FilterNumericColumn {
    fn name(&self) -> &'static str {
        "Filter rows based on numeric column"
    }

    fn validate(&self, matrix: &AnnotatedMatrix) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(MatrixError::InvalidParameter(format!(
                    "Minimum {} exceeds maximum {}",
                    min, max
                )));
            }
        }
        self.column_index(matrix).map(|_| ())
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        _info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        let index = self.column_index(matrix)?;
        let keep: Vec<usize> = matrix
            .numeric_column_view(index)
            .iter()
            .enumerate()
            .filter(|(_, &v)| self.accepts(v))
            .map(|(row, _)| row)
            .collect();
        keep_rows(matrix, &keep)?;
        Ok(TransformOutput::default())
    }
}
