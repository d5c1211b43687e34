//! Collapsing expression columns into one column per group.

use crate::data::cell::is_valid;
use crate::data::{check_disjoint, AnnotatedMatrix, Categories, FamilyParts};
use crate::error::{MatrixError, Result};
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformOutput};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Statistic used to summarize a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupSummary {
    Mean,
    Median,
}

impl GroupSummary {
    fn apply(&self, values: Vec<f64>) -> f64 {
        match self {
            Self::Mean => values.iter().mean(),
            Self::Median => Data::new(values).median(),
        }
    }
}

fn default_min_valid() -> usize {
    1
}

/// Replace the expression columns with one summary column per group.
///
/// Groups must not overlap. A cell becomes NaN when its group has fewer than
/// `min_valid` valid values in that row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageGroups {
    pub grouping: String,
    pub summary: GroupSummary,
    #[serde(default = "default_min_valid")]
    pub min_valid: usize,
}

impl AverageGroups {
    fn groups(&self, matrix: &AnnotatedMatrix) -> Result<(Vec<String>, Vec<Vec<usize>>)> {
        let (labels, members) = matrix.group_indices(&self.grouping, None)?;
        if labels.is_empty() {
            return Err(MatrixError::Transform(format!(
                "Grouping '{}' has no groups",
                self.grouping
            )));
        }
        check_disjoint(&members)?;
        Ok((labels, members))
    }
}

impl Transform for AverageGroups {
    fn name(&self) -> &'static str {
        "Average groups"
    }

    fn validate(&self, matrix: &AnnotatedMatrix) -> Result<()> {
        if self.min_valid == 0 {
            return Err(MatrixError::InvalidParameter(
                "Minimum number of valid values must be at least 1".to_string(),
            ));
        }
        self.groups(matrix).map(|_| ())
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        self.validate(matrix)?;
        let (labels, members) = self.groups(matrix)?;
        let n_rows = matrix.row_count();
        let source: &AnnotatedMatrix = matrix;

        let columns: Vec<Vec<f32>> = info.install(|| {
            members
                .par_iter()
                .map(|cols| {
                    (0..n_rows)
                        .map(|row| {
                            let valid: Vec<f64> = cols
                                .iter()
                                .map(|&col| source.expression(row, col))
                                .filter(|&v| is_valid(v))
                                .map(f64::from)
                                .collect();
                            if valid.len() < self.min_valid {
                                f32::NAN
                            } else {
                                self.summary.apply(valid) as f32
                            }
                        })
                        .collect()
                })
                .collect()
        })?;

        let mut parts = source.to_parts();
        parts.expression = FamilyParts {
            names: labels.clone(),
            descriptions: vec![String::new(); labels.len()],
            columns,
        };
        parts.quality = None;
        parts.imputed = None;

        let mut category_rows = FamilyParts::default();
        for (name, description, row) in source.category_rows().iter() {
            let merged = members
                .iter()
                .map(|cols| intersect(cols.iter().map(|&c| &row[c])))
                .collect();
            category_rows.push(name, description, merged);
        }
        parts.category_rows = category_rows;

        let mut numeric_rows = FamilyParts::default();
        for (name, description, row) in source.numeric_rows().iter() {
            let merged = members
                .iter()
                .map(|cols| {
                    let valid: Vec<f64> = cols.iter().map(|&c| row[c]).filter(|v| !v.is_nan()).collect();
                    if valid.is_empty() {
                        f64::NAN
                    } else {
                        valid.iter().mean()
                    }
                })
                .collect();
            numeric_rows.push(name, description, merged);
        }
        parts.numeric_rows = numeric_rows;

        let mut result = source.create_new_instance();
        result.set_data(parts)?;
        log::info!(
            "Averaged {} columns into {} groups",
            source.expression_column_count(),
            labels.len()
        );
        *matrix = result;
        Ok(TransformOutput::default())
    }
}

/// Labels shared by every set.
fn intersect<'a>(mut sets: impl Iterator<Item = &'a Categories>) -> Categories {
    let Some(first) = sets.next() else {
        return Categories::new();
    };
    sets.fold(first.clone(), |acc, s| acc.intersection(s).cloned().collect())
}
