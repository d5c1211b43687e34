//! Random row subsampling.

use crate::data::AnnotatedMatrix;
use crate::error::Result;
use crate::filter::result::keep_rows;
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformOutput};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};

/// Keep a seeded random subset of `rows` rows, in their original order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRandomRows {
    pub rows: usize,
    pub seed: u64,
}

impl FilterRandomRows {
    /// Row indices that survive, sorted.
    pub fn select(&self, row_count: usize) -> Vec<usize> {
        if self.rows >= row_count {
            return (0..row_count).collect();
        }
        let mut rng = Xoshiro256Plus::seed_from_u64(self.seed);
        let mut keep = sample(&mut rng, row_count, self.rows).into_vec();
        keep.sort_unstable();
        keep
    }
}

impl Transform for FilterRandomRows {
    fn name(&self) -> &'static str {
        "Filter random rows"
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        _info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        let keep = self.select(matrix.row_count());
        keep_rows(matrix, &keep)?;
        Ok(TransformOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_and_ordered() {
        let filter = FilterRandomRows { rows: 10, seed: 7 };
        let a = filter.select(100);
        let b = filter.select(100);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_more_rows_than_available() {
        let filter = FilterRandomRows { rows: 10, seed: 7 };
        assert_eq!(filter.select(3), vec![0, 1, 2]);
    }

    #[test]
    fn test_process_keeps_alignment() {
        let mut matrix = AnnotatedMatrix::new();
        let values: Vec<f32> = (0..20).map(|i| i as f32).collect();
        matrix.add_expression_column("S1", "", values).unwrap();
        matrix
            .add_numeric_column("Copy", "", (0..20).map(f64::from).collect())
            .unwrap();
        FilterRandomRows { rows: 5, seed: 1 }
            .process(&mut matrix, &[], &mut ProcessInfo::new())
            .unwrap();
        assert_eq!(matrix.row_count(), 5);
        for row in 0..5 {
            assert_eq!(matrix.expression(row, 0) as f64, matrix.numeric_column_view(0)[row]);
        }
    }
}
