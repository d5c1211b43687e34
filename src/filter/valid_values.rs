//! Filtering rows by the number of valid expression values.

use crate::data::cell::is_valid;
use crate::data::AnnotatedMatrix;
use crate::error::{MatrixError, Result};
use crate::filter::result::keep_rows;
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformOutput};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Where valid values are counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidValuesMode {
    /// Across all expression columns.
    Total,
    /// In every group of the grouping.
    EachGroup { grouping: String },
    /// In at least one group of the grouping.
    AnyGroup { grouping: String },
}

/// Keep rows with at least `min_valid` finite expression values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValidValues {
    pub min_valid: usize,
    pub mode: ValidValuesMode,
}

impl FilterValidValues {
    /// Count valid values overall.
    pub fn total(min_valid: usize) -> Self {
        Self {
            min_valid,
            mode: ValidValuesMode::Total,
        }
    }

    fn grouping(&self) -> Option<&str> {
        match &self.mode {
            ValidValuesMode::Total => None,
            ValidValuesMode::EachGroup { grouping } | ValidValuesMode::AnyGroup { grouping } => {
                Some(grouping)
            }
        }
    }

    /// Column sets to count in; one set covering everything for `Total`.
    fn column_sets(&self, matrix: &AnnotatedMatrix) -> Result<Vec<Vec<usize>>> {
        match self.grouping() {
            None => Ok(vec![(0..matrix.expression_column_count()).collect()]),
            Some(grouping) => {
                let (labels, members) = matrix.group_indices(grouping, None)?;
                if labels.is_empty() {
                    return Err(MatrixError::Transform(format!(
                        "Grouping '{}' has no groups",
                        grouping
                    )));
                }
                Ok(members)
            }
        }
    }
}

impl Transform for FilterValidValues {
    fn name(&self) -> &'static str {
        "Filter rows based on valid values"
    }

    fn validate(&self, matrix: &AnnotatedMatrix) -> Result<()> {
        self.column_sets(matrix).map(|_| ())
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        let sets = self.column_sets(matrix)?;
        let any = matches!(self.mode, ValidValuesMode::AnyGroup { .. });
        let view: &AnnotatedMatrix = matrix;
        let keep: Vec<usize> = info.install(|| {
            (0..view.row_count())
                .into_par_iter()
                .filter(|&row| {
                    let mut passing = sets.iter().map(|cols| {
                        let n = cols
                            .iter()
                            .filter(|&&col| is_valid(view.expression(row, col)))
                            .count();
                        n >= self.min_valid
                    });
                    if any {
                        passing.any(|p| p)
                    } else {
                        passing.all(|p| p)
                    }
                })
                .collect()
        })?;
        keep_rows(matrix, &keep)?;
        Ok(TransformOutput::default())
    }
}
