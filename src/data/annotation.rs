//! Row annotations: category rows and numeric rows running along the
//! expression columns, plus group partitioning on top of them.

use crate::data::cell::Categories;
use crate::data::family::ColumnFamily;
use crate::data::matrix::AnnotatedMatrix;
use crate::error::{MatrixError, Result};
use std::collections::BTreeSet;

impl AnnotatedMatrix {
    /// All category rows.
    pub fn category_rows(&self) -> &ColumnFamily<Categories> {
        &self.category_rows
    }

    /// Labels of category row `index`, one set per expression column.
    pub fn category_row(&self, index: usize) -> &[Categories] {
        self.category_rows.column_view(index)
    }

    /// Index of the category row named `name`.
    pub fn category_row_index(&self, name: &str) -> Option<usize> {
        self.category_rows.index_of(name)
    }

    /// Append a category row. `values` needs one entry per expression column.
    pub fn add_category_row(
        &mut self,
        name: &str,
        description: &str,
        values: Vec<Categories>,
    ) -> Result<()> {
        let n = self.expression_column_count();
        self.category_rows.push(name, description, values, n)
    }

    /// Replace the category row at `index`.
    pub fn set_category_row_at(
        &mut self,
        index: usize,
        name: &str,
        description: &str,
        values: Vec<Categories>,
    ) -> Result<()> {
        let n = self.expression_column_count();
        self.category_rows.set(index, name, description, values, n)
    }

    /// Remove the category row at `index`.
    pub fn remove_category_row_at(&mut self, index: usize) -> Result<()> {
        self.category_rows.remove(index).map(|_| ())
    }

    /// All numeric rows.
    pub fn numeric_rows(&self) -> &ColumnFamily<f64> {
        &self.numeric_rows
    }

    /// Values of numeric row `index`, one per expression column.
    pub fn numeric_row(&self, index: usize) -> &[f64] {
        self.numeric_rows.column_view(index)
    }

    /// Index of the numeric row named `name`.
    pub fn numeric_row_index(&self, name: &str) -> Option<usize> {
        self.numeric_rows.index_of(name)
    }

    /// Append a numeric row with one value per expression column.
    pub fn add_numeric_row(&mut self, name: &str, description: &str, values: Vec<f64>) -> Result<()> {
        let n = self.expression_column_count();
        self.numeric_rows.push(name, description, values, n)
    }

    /// Replace the numeric row at `index`.
    pub fn set_numeric_row_at(
        &mut self,
        index: usize,
        name: &str,
        description: &str,
        values: Vec<f64>,
    ) -> Result<()> {
        let n = self.expression_column_count();
        self.numeric_rows.set(index, name, description, values, n)
    }

    /// Remove the numeric row at `index`.
    pub fn remove_numeric_row_at(&mut self, index: usize) -> Result<()> {
        self.numeric_rows.remove(index).map(|_| ())
    }

    /// Sorted distinct labels used in category row `row`.
    pub fn group_labels(&self, row: usize) -> Vec<String> {
        let labels: BTreeSet<&String> = self.category_row(row).iter().flatten().collect();
        labels.into_iter().cloned().collect()
    }

    /// Expression-column indices for each group of the named grouping.
    ///
    /// # Arguments
    /// * `grouping` - Name of the category row
    /// * `groups` - Labels to partition by; all distinct labels when `None`
    ///
    /// # Returns
    /// The labels used and, for each, the member column indices.
    pub fn group_indices(
        &self,
        grouping: &str,
        groups: Option<&[String]>,
    ) -> Result<(Vec<String>, Vec<Vec<usize>>)> {
        let row = self
            .category_row_index(grouping)
            .ok_or_else(|| MatrixError::Transform(format!("Grouping '{}' not found", grouping)))?;
        let labels = match groups {
            Some(g) => g.to_vec(),
            None => self.group_labels(row),
        };
        let members = partition_groups(self.category_row(row), &labels);
        Ok((labels, members))
    }
}

/// For each label in `groups`, the column indices whose label set contains it.
///
/// A column may fall into zero, one or several groups.
pub fn partition_groups(row: &[Categories], groups: &[String]) -> Vec<Vec<usize>> {
    groups
        .iter()
        .map(|g| {
            row.iter()
                .enumerate()
                .filter(|(_, labels)| labels.contains(g))
                .map(|(j, _)| j)
                .collect()
        })
        .collect()
}

/// Check that no column belongs to more than one group.
pub fn check_disjoint(members: &[Vec<usize>]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for group in members {
        for &j in group {
            if !seen.insert(j) {
                return Err(MatrixError::Transform(format!(
                    "Groups overlap at column {}",
                    j
                )));
            }
        }
    }
    Ok(())
}
