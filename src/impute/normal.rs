//! Imputation of missing values from a down-shifted normal distribution.

use crate::data::cell::is_valid;
use crate::data::AnnotatedMatrix;
use crate::error::{MatrixError, Result};
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformOutput};
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Where the distribution parameters are estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeMode {
    /// One mean and deviation over all expression values.
    WholeMatrix,
    /// Separately for every expression column.
    EachColumn,
}

/// Replace non-finite expression values with draws from
/// `Normal(mean - down_shift * sd, width * sd)` and flag them as imputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplaceMissingFromNormal {
    pub width: f64,
    pub down_shift: f64,
    pub mode: ImputeMode,
    pub seed: u64,
}

impl Default for ReplaceMissingFromNormal {
    fn default() -> Self {
        Self {
            width: 0.3,
            down_shift: 1.8,
            mode: ImputeMode::EachColumn,
            seed: 0,
        }
    }
}

/// Mean and sample deviation of the finite values, if there are at least two.
fn moments<'a>(values: impl Iterator<Item = &'a f32>) -> Option<(f64, f64)> {
    let valid: Vec<f64> = values.filter(|v| is_valid(**v)).map(|&v| v as f64).collect();
    if valid.len() < 2 {
        return None;
    }
    let sd = valid.iter().std_dev();
    Some((valid.iter().mean(), sd))
}

impl ReplaceMissingFromNormal {
    fn distribution(&self, mean: f64, sd: f64) -> Result<Normal<f64>> {
        Normal::new(mean - self.down_shift * sd, self.width * sd)
            .map_err(|e| MatrixError::Numerical(format!("Invalid normal distribution: {}", e)))
    }

    /// Fill one column; returns the rows that were replaced.
    fn fill_column(&self, column: &mut [f32], col: usize, dist: &Normal<f64>) -> Vec<usize> {
        let mut rng = Xoshiro256Plus::seed_from_u64(self.seed.wrapping_add(col as u64));
        let mut replaced = Vec::new();
        for (row, v) in column.iter_mut().enumerate() {
            if !is_valid(*v) {
                *v = rng.sample(dist) as f32;
                replaced.push(row);
            }
        }
        replaced
    }
}

impl Transform for ReplaceMissingFromNormal {
    fn name(&self) -> &'static str {
        "Replace missing values from normal distribution"
    }

    fn validate(&self, _matrix: &AnnotatedMatrix) -> Result<()> {
        if !(self.width > 0.0) || !self.width.is_finite() {
            return Err(MatrixError::InvalidParameter(format!(
                "Width must be positive, got {}",
                self.width
            )));
        }
        if !self.down_shift.is_finite() {
            return Err(MatrixError::InvalidParameter(
                "Down shift must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        self.validate(matrix)?;
        let n_rows = matrix.row_count();
        let n_cols = matrix.expression_column_count();
        if n_rows == 0 || n_cols == 0 {
            return Ok(TransformOutput::default());
        }

        // One distribution per column; None marks columns left untouched.
        let distributions: Vec<Option<Normal<f64>>> = match self.mode {
            ImputeMode::WholeMatrix => {
                let (mean, sd) = moments(matrix.expression_values_view().iter()).ok_or_else(|| {
                    MatrixError::EmptyData("Fewer than two valid values in the matrix".to_string())
                })?;
                let dist = self.distribution(mean, sd)?;
                vec![Some(dist); n_cols]
            }
            ImputeMode::EachColumn => (0..n_cols)
                .map(|col| match moments(matrix.expression_column_view(col).iter()) {
                    Some((mean, sd)) => self.distribution(mean, sd).map(Some),
                    None => {
                        log::warn!(
                            "Column '{}' has fewer than two valid values, skipping",
                            matrix.expression_names()[col]
                        );
                        Ok(None)
                    }
                })
                .collect::<Result<_>>()?,
        };

        let values = matrix.expression_values_view_mut();
        let replaced: Vec<Vec<usize>> = info.install(|| {
            values
                .par_chunks_mut(n_rows)
                .zip(distributions.par_iter())
                .enumerate()
                .map(|(col, (column, dist))| match dist {
                    Some(dist) => self.fill_column(column, col, dist),
                    None => Vec::new(),
                })
                .collect()
        })?;

        let mut total = 0;
        for (col, rows) in replaced.iter().enumerate() {
            for &row in rows {
                matrix.set_imputed(row, col, true);
            }
            total += rows.len();
        }
        log::info!("Imputed {} values", total);
        Ok(TransformOutput::default())
    }
}
