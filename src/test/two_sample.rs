//! Welch two-sample t-test between two groups of expression columns.

use crate::data::cell::is_valid;
use crate::data::{categories, check_disjoint, AnnotatedMatrix, Categories, Document};
use crate::error::{MatrixError, Result};
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformDescriptor, TransformOutput};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

/// Result of one Welch test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchResult {
    /// Mean of the first sample minus mean of the second.
    pub difference: f64,
    /// t statistic.
    pub statistic: f64,
    /// Welch-Satterthwaite degrees of freedom.
    pub df: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

impl WelchResult {
    fn missing() -> Self {
        Self {
            difference: f64::NAN,
            statistic: f64::NAN,
            df: f64::NAN,
            p_value: f64::NAN,
        }
    }
}

/// Welch t-test of `a` against `b`.
///
/// Returns `None` when either sample has fewer than two values or both
/// variances are zero.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<WelchResult> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let (m1, m2) = (a.iter().mean(), b.iter().mean());
    let (v1, v2) = (a.iter().variance() / n1, b.iter().variance() / n2);
    let se2 = v1 + v2;
    if !(se2 > 0.0) {
        return None;
    }
    let statistic = (m1 - m2) / se2.sqrt();
    let df = se2 * se2 / (v1 * v1 / (n1 - 1.0) + v2 * v2 / (n2 - 1.0));
    let p_value = StudentsT::new(0.0, 1.0, df)
        .ok()
        .map(|t| 2.0 * t.sf(statistic.abs()))?;
    Some(WelchResult {
        difference: m1 - m2,
        statistic,
        df,
        p_value,
    })
}

fn default_min_valid() -> usize {
    2
}

fn default_alpha() -> f64 {
    0.05
}

/// Test every row for a difference between two groups of a grouping.
///
/// Adds numeric columns with the difference, statistic, p-value and
/// -log10 p-value, a `Significant` categorical column (`+` when
/// `p < alpha`), and returns a summary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoSampleTest {
    pub grouping: String,
    pub first: String,
    pub second: String,
    #[serde(default = "default_min_valid")]
    pub min_valid: usize,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl TwoSampleTest {
    fn suffix(&self) -> String {
        format!("{}_{}", self.first, self.second)
    }

    fn numeric_names(&self) -> [String; 4] {
        let suffix = self.suffix();
        [
            format!("Welch test Difference {}", suffix),
            format!("Welch test Statistic {}", suffix),
            format!("Welch test p-value {}", suffix),
            format!("-Log Welch test p-value {}", suffix),
        ]
    }

    fn category_name(&self) -> String {
        format!("Welch test Significant {}", self.suffix())
    }

    fn members(&self, matrix: &AnnotatedMatrix) -> Result<(Vec<usize>, Vec<usize>)> {
        let groups = [self.first.clone(), self.second.clone()];
        let (_, mut members) = matrix.group_indices(&self.grouping, Some(&groups[..]))?;
        for (label, cols) in groups.iter().zip(&members) {
            if cols.is_empty() {
                return Err(MatrixError::Transform(format!(
                    "Group '{}' not found in grouping '{}'",
                    label, self.grouping
                )));
            }
        }
        check_disjoint(&members)?;
        let second = members.pop().unwrap_or_default();
        let first = members.pop().unwrap_or_default();
        Ok((first, second))
    }
}

impl Transform for TwoSampleTest {
    fn name(&self) -> &'static str {
        "Two-sample test"
    }

    fn descriptor(&self) -> TransformDescriptor {
        TransformDescriptor {
            documents: 1,
            ..Default::default()
        }
    }

    fn validate(&self, matrix: &AnnotatedMatrix) -> Result<()> {
        if self.first == self.second {
            return Err(MatrixError::InvalidParameter(
                "The two groups must differ".to_string(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(MatrixError::InvalidParameter(format!(
                "Significance level must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        for name in self.numeric_names() {
            if matrix.numeric_columns().contains(&name) {
                return Err(MatrixError::DuplicateName {
                    family: crate::data::Family::Numeric,
                    name,
                });
            }
        }
        let category = self.category_name();
        if matrix.category_columns().contains(&category) {
            return Err(MatrixError::DuplicateName {
                family: crate::data::Family::Category,
                name: category,
            });
        }
        self.members(matrix).map(|_| ())
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        self.validate(matrix)?;
        let (first, second) = self.members(matrix)?;
        let min_valid = self.min_valid.max(2);
        let view: &AnnotatedMatrix = matrix;

        let results: Vec<WelchResult> = info.install(|| {
            (0..view.row_count())
                .into_par_iter()
                .map(|row| {
                    let pick = |cols: &[usize]| -> Vec<f64> {
                        cols.iter()
                            .map(|&c| view.expression(row, c))
                            .filter(|&v| is_valid(v))
                            .map(f64::from)
                            .collect()
                    };
                    let (a, b) = (pick(&first), pick(&second));
                    if a.len() < min_valid || b.len() < min_valid {
                        return WelchResult::missing();
                    }
                    welch_t_test(&a, &b).unwrap_or_else(WelchResult::missing)
                })
                .collect()
        })?;

        let significant: Vec<Categories> = results
            .iter()
            .map(|r| {
                if r.p_value < self.alpha {
                    categories(["+"])
                } else {
                    Categories::new()
                }
            })
            .collect();
        let n_tested = results.iter().filter(|r| !r.p_value.is_nan()).count();
        let n_significant = significant.iter().filter(|s| !s.is_empty()).count();

        let [difference, statistic, p_value, log_p] = self.numeric_names();
        matrix.add_numeric_column(&difference, "", results.iter().map(|r| r.difference).collect())?;
        matrix.add_numeric_column(&statistic, "", results.iter().map(|r| r.statistic).collect())?;
        matrix.add_numeric_column(&p_value, "", results.iter().map(|r| r.p_value).collect())?;
        matrix.add_numeric_column(&log_p, "", results.iter().map(|r| -r.p_value.log10()).collect())?;
        matrix.add_category_column(&self.category_name(), "", significant)?;

        log::info!("{} of {} rows significant", n_significant, n_tested);
        let text = format!(
            "Grouping: {}\nGroups: {} ({} columns) vs {} ({} columns)\nRows tested: {}\nSignificant at alpha = {}: {}\n",
            self.grouping,
            self.first,
            first.len(),
            self.second,
            second.len(),
            n_tested,
            self.alpha,
            n_significant
        );
        Ok(TransformOutput {
            supplementary_tables: Vec::new(),
            documents: vec![Document::new(
                format!("Welch test {} vs {}", self.first, self.second),
                text,
            )],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::run_transform;

    fn create_test_matrix() -> AnnotatedMatrix {
        let mut matrix = AnnotatedMatrix::new();
        matrix.add_expression_column("C1", "", vec![1.0, 5.0, 1.0]).unwrap();
        matrix.add_expression_column("C2", "", vec![1.1, 6.0, f32::NAN]).unwrap();
        matrix.add_expression_column("C3", "", vec![0.9, 5.5, f32::NAN]).unwrap();
        matrix.add_expression_column("T1", "", vec![10.0, 5.2, 2.0]).unwrap();
        matrix.add_expression_column("T2", "", vec![10.2, 5.8, 3.0]).unwrap();
        matrix.add_expression_column("T3", "", vec![9.8, 5.4, 4.0]).unwrap();
        let labels = ["ctrl", "ctrl", "ctrl", "trt", "trt", "trt"];
        matrix
            .add_category_row("Condition", "", labels.iter().map(|l| categories([*l])).collect())
            .unwrap();
        matrix
    }

    fn create_test() -> TwoSampleTest {
        TwoSampleTest {
            grouping: "Condition".into(),
            first: "trt".into(),
            second: "ctrl".into(),
            min_valid: 2,
            alpha: 0.05,
        }
    }

    #[test]
    fn test_welch_known_values() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = welch_t_test(&a, &b).unwrap();
        assert!((r.difference + 3.5).abs() < 1e-10);
        // var(a)/4 = 0.4167, var(b)/5 = 2.0
        assert!((r.statistic + 3.5 / (1.25f64 / 3.0 + 2.0).sqrt()).abs() < 1e-10);
        assert!(r.p_value > 0.0 && r.p_value < 0.1);
    }

    #[test]
    fn test_welch_tiny_p_value_is_resolved() {
        let a = [10.0, 10.01, 9.99, 10.0, 10.02, 9.98];
        let b = [0.0, 0.01, -0.01, 0.0, 0.02, -0.02];
        let r = welch_t_test(&a, &b).unwrap();
        // 1 - cdf rounds to zero this far out in the tail.
        assert!(r.p_value > 0.0);
        assert!(r.p_value < 1e-15);
        assert!((-r.p_value.log10()).is_finite());
    }

    #[test]
    fn test_welch_degenerate() {
        assert!(welch_t_test(&[1.0], &[2.0, 3.0]).is_none());
        assert!(welch_t_test(&[1.0, 1.0], &[2.0, 2.0]).is_none());
    }

    #[test]
    fn test_adds_columns_and_document() {
        let mut matrix = create_test_matrix();
        let output = run_transform(&create_test(), &mut matrix, &[], &mut ProcessInfo::new()).unwrap();

        assert_eq!(matrix.numeric_columns().len(), 4);
        let p = matrix.numeric_column(2);
        assert!(p[0] < 0.05);
        assert!(p[1] > 0.05);
        assert!(p[2].is_nan());
        let diff = matrix.numeric_column(0);
        assert!((diff[0] - 9.0).abs() < 1e-5);
        let sig = matrix.category_column(0);
        assert_eq!(sig[0], categories(["+"]));
        assert!(sig[1].is_empty() && sig[2].is_empty());
        assert_eq!(output.documents.len(), 1);
        assert!(output.documents[0].text.contains("Rows tested: 2"));
    }

    #[test]
    fn test_unknown_group() {
        let mut test = create_test();
        test.second = "other".into();
        assert!(matches!(
            test.validate(&create_test_matrix()),
            Err(MatrixError::Transform(_))
        ));
    }

    #[test]
    fn test_rerun_is_rejected_before_mutation() {
        let mut matrix = create_test_matrix();
        create_test()
            .process(&mut matrix, &[], &mut ProcessInfo::new())
            .unwrap();
        let before = matrix.clone();
        assert!(create_test()
            .process(&mut matrix, &[], &mut ProcessInfo::new())
            .is_err());
        assert_eq!(matrix.numeric_columns().names(), before.numeric_columns().names());
        assert_eq!(matrix.category_columns().len(), before.category_columns().len());
    }
}
