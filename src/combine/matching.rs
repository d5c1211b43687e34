//! Annotating rows from a second matrix by matching identifiers.

use crate::data::cell::SUBVALUE_SEPARATOR;
use crate::data::AnnotatedMatrix;
use crate::error::{MatrixError, Result};
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformDescriptor, TransformOutput};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Copy numeric and text columns of a second matrix onto matching rows.
///
/// Rows match when their `key` and `other_key` text cells share at least one
/// `;`-separated identifier. Numeric columns receive the mean of the matched
/// values, text columns their distinct values joined by `;`. Names that
/// already exist get a numeric suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRowsByName {
    pub key: String,
    pub other_key: String,
}

fn split_ids(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(SUBVALUE_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// First of `name`, `name_2`, `name_3`, ... not rejected by `taken`.
fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    (2..)
        .map(|i| format!("{}_{}", name, i))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

impl MatchRowsByName {
    /// For each row of `matrix`, the sorted matching rows of `other`.
    fn matches(&self, matrix: &AnnotatedMatrix, other: &AnnotatedMatrix) -> Result<Vec<Vec<usize>>> {
        let key = matrix
            .text_columns()
            .index_of(&self.key)
            .ok_or_else(|| MatrixError::MissingColumn(self.key.clone()))?;
        let other_key = other
            .text_columns()
            .index_of(&self.other_key)
            .ok_or_else(|| MatrixError::MissingColumn(self.other_key.clone()))?;

        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (row, cell) in other.text_column_view(other_key).iter().enumerate() {
            for id in split_ids(cell) {
                index.entry(id).or_default().push(row);
            }
        }
        Ok(matrix
            .text_column_view(key)
            .iter()
            .map(|cell| {
                let rows: BTreeSet<usize> = split_ids(cell)
                    .filter_map(|id| index.get(id))
                    .flatten()
                    .copied()
                    .collect();
                rows.into_iter().collect()
            })
            .collect())
    }
}

impl Transform for MatchRowsByName {
    fn name(&self) -> &'static str {
        "Matching rows by name"
    }

    fn descriptor(&self) -> TransformDescriptor {
        TransformDescriptor {
            inputs: 2,
            ..Default::default()
        }
    }

    fn validate(&self, matrix: &AnnotatedMatrix) -> Result<()> {
        if !matrix.text_columns().contains(&self.key) {
            return Err(MatrixError::MissingColumn(self.key.clone()));
        }
        Ok(())
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        extra: &[AnnotatedMatrix],
        info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        let other = extra.first().ok_or_else(|| {
            MatrixError::InvalidParameter("Matching rows needs a second matrix".to_string())
        })?;
        let matches = self.matches(matrix, other)?;
        info.progress(50);

        let mut numeric = Vec::new();
        for (name, description, values) in other.numeric_columns().iter() {
            let merged: Vec<f64> = matches
                .iter()
                .map(|rows| {
                    let valid: Vec<f64> = rows.iter().map(|&r| values[r]).filter(|v| !v.is_nan()).collect();
                    if valid.is_empty() {
                        f64::NAN
                    } else {
                        valid.iter().sum::<f64>() / valid.len() as f64
                    }
                })
                .collect();
            let name = unique_name(name, |n| {
                matrix.numeric_columns().contains(n)
                    || numeric.iter().any(|(m, _, _): &(String, String, Vec<f64>)| m == n)
            });
            numeric.push((name, description.to_string(), merged));
        }

        let mut text = Vec::new();
        for (name, description, values) in other.text_columns().iter() {
            if name == self.other_key {
                continue;
            }
            let merged: Vec<String> = matches
                .iter()
                .map(|rows| {
                    let mut seen = BTreeSet::new();
                    rows.iter()
                        .map(|&r| values[r].as_str())
                        .filter(|v| !v.is_empty() && seen.insert(*v))
                        .collect::<Vec<_>>()
                        .join(";")
                })
                .collect();
            let name = unique_name(name, |n| {
                matrix.text_columns().contains(n)
                    || text.iter().any(|(m, _, _): &(String, String, Vec<String>)| m == n)
            });
            text.push((name, description.to_string(), merged));
        }

        let n_matched = matches.iter().filter(|m| !m.is_empty()).count();
        for (name, description, values) in numeric {
            matrix.add_numeric_column(&name, &description, values)?;
        }
        for (name, description, values) in text {
            matrix.add_text_column(&name, &description, values)?;
        }
        log::info!(
            "Matched {} of {} rows against {}",
            n_matched,
            matrix.row_count(),
            other.name()
        );
        Ok(TransformOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::run_transform;

    fn create_main() -> AnnotatedMatrix {
        let mut matrix = AnnotatedMatrix::new();
        matrix.add_expression_column("S1", "", vec![1.0, 2.0, 3.0]).unwrap();
        matrix
            .add_text_column(
                "Protein IDs",
                "",
                vec!["P1;P2".into(), "P3".into(), "P9".into()],
            )
            .unwrap();
        matrix.add_numeric_column("Score", "", vec![0.0; 3]).unwrap();
        matrix
    }

    fn create_other() -> AnnotatedMatrix {
        let mut matrix = AnnotatedMatrix::new();
        matrix
            .add_text_column(
                "Accession",
                "",
                vec!["P1".into(), "P2".into(), "P3; P4".into()],
            )
            .unwrap();
        matrix
            .add_text_column("Gene", "", vec!["A".into(), "A".into(), "C".into()])
            .unwrap();
        matrix
            .add_numeric_column("Score", "", vec![1.0, 3.0, f64::NAN])
            .unwrap();
        matrix
    }

    #[test]
    fn test_match_and_merge() {
        let mut matrix = create_main();
        let params = MatchRowsByName {
            key: "Protein IDs".into(),
            other_key: "Accession".into(),
        };
        run_transform(&params, &mut matrix, &[create_other()], &mut ProcessInfo::new()).unwrap();

        assert_eq!(matrix.numeric_columns().names(), &["Score", "Score_2"]);
        let score = matrix.numeric_column(1);
        assert_eq!(score[0], 2.0);
        assert!(score[1].is_nan());
        assert!(score[2].is_nan());
        assert_eq!(matrix.text_columns().names(), &["Protein IDs", "Gene"]);
        assert_eq!(matrix.text_column_view(1), &["A", "C", ""]);
    }

    #[test]
    fn test_requires_second_input() {
        let mut matrix = create_main();
        let params = MatchRowsByName {
            key: "Protein IDs".into(),
            other_key: "Accession".into(),
        };
        assert!(run_transform(&params, &mut matrix, &[], &mut ProcessInfo::new()).is_err());
    }

    #[test]
    fn test_missing_key_column() {
        let mut matrix = create_main();
        let params = MatchRowsByName {
            key: "Protein IDs".into(),
            other_key: "Nope".into(),
        };
        assert!(matches!(
            params.process(&mut matrix, &[create_other()], &mut ProcessInfo::new()),
            Err(MatrixError::MissingColumn(_))
        ));
        assert_eq!(matrix.numeric_columns().len(), 1);
    }

    #[test]
    fn test_unique_name() {
        let taken = ["a", "a_2"];
        assert_eq!(unique_name("a", |n| taken.contains(&n)), "a_3");
        assert_eq!(unique_name("b", |n| taken.contains(&n)), "b");
    }
}
