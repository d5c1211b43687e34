//! Logarithmic transformation of expression values.

use crate::data::AnnotatedMatrix;
use crate::error::{MatrixError, Result};
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformOutput};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Replace every expression value `x` by `log_base(x)`; non-positive values become NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogTransform {
    pub base: f64,
}

impl Default for LogTransform {
    fn default() -> Self {
        Self { base: 2.0 }
    }
}

impl Transform for LogTransform {
    fn name(&self) -> &'static str {
        "Log"
    }

    fn validate(&self, _matrix: &AnnotatedMatrix) -> Result<()> {
        if !(self.base > 0.0) || self.base == 1.0 || !self.base.is_finite() {
            return Err(MatrixError::InvalidParameter(format!(
                "Invalid logarithm base {}",
                self.base
            )));
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
        let ln_base = self.base.ln();
        let values = matrix.expression_values_view_mut();
        info.install(|| {
            values.par_iter_mut().for_each(|v| {
                *v = if *v > 0.0 {
                    ((*v as f64).ln() / ln_base) as f32
                } else {
                    f32::NAN
                };
            });
        })?;
        Ok(TransformOutput::default())
    }
}
