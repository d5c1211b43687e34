//! Z-score standardization of expression rows or columns.

use crate::data::cell::is_valid;
use crate::data::AnnotatedMatrix;
use crate::error::Result;
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformOutput};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Direction of standardization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Rows,
    Columns,
}

/// Subtract the mean (or median) and divide by the sample standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZScore {
    pub axis: Axis,
    #[serde(default)]
    pub use_median: bool,
}

/// Standardize the finite values of `values` in place.
///
/// With fewer than two finite values, or no spread, every cell becomes NaN.
pub fn standardize(values: &mut [f32], use_median: bool) {
    let valid: Vec<f64> = values
        .iter()
        .filter(|v| is_valid(**v))
        .map(|&v| v as f64)
        .collect();
    let sd = if valid.len() < 2 {
        f64::NAN
    } else {
        valid.iter().std_dev()
    };
    if !sd.is_finite() || sd == 0.0 {
        values.iter_mut().for_each(|v| *v = f32::NAN);
        return;
    }
    let center = if use_median {
        Data::new(valid).median()
    } else {
        valid.iter().mean()
    };
    for v in values.iter_mut() {
        *v = if is_valid(*v) {
            ((*v as f64 - center) / sd) as f32
        } else {
            f32::NAN
        };
    }
}

impl Transform for ZScore {
    fn name(&self) -> &'static str {
        "Z-score"
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        let n_rows = matrix.row_count();
        let n_cols = matrix.expression_column_count();
        if n_rows == 0 || n_cols == 0 {
            return Ok(TransformOutput::default());
        }
        let use_median = self.use_median;
        match self.axis {
            Axis::Columns => {
                let values = matrix.expression_values_view_mut();
                info.install(|| {
                    values
                        .par_chunks_mut(n_rows)
                        .for_each(|column| standardize(column, use_median));
                })?;
            }
            Axis::Rows => {
                let view: &AnnotatedMatrix = matrix;
                let rows: Vec<Vec<f32>> = info.install(|| {
                    (0..n_rows)
                        .into_par_iter()
                        .map(|row| {
                            let mut values = view.expression_row(row);
                            standardize(&mut values, use_median);
                            values
                        })
                        .collect()
                })?;
                for (row, values) in rows.into_iter().enumerate() {
                    for (col, v) in values.into_iter().enumerate() {
                        matrix.set_expression(row, col, v);
                    }
                }
            }
        }
        Ok(TransformOutput::default())
    }
}
