//! The annotated data matrix shared by every transform.

use crate::data::cell::Categories;
use crate::data::expression::ExpressionBlock;
use crate::data::family::{ColumnFamily, Family, FamilyParts};
use crate::error::{MatrixError, Result};
use nalgebra::DMatrix;
use std::collections::HashSet;

/// Bulk contents of an [`AnnotatedMatrix`], consumed by [`AnnotatedMatrix::set_data`].
#[derive(Debug, Clone, Default)]
pub struct MatrixParts {
    pub row_count: usize,
    pub expression: FamilyParts<f32>,
    pub quality: Option<Vec<Vec<f32>>>,
    pub imputed: Option<Vec<Vec<bool>>>,
    pub numeric: FamilyParts<f64>,
    pub category: FamilyParts<Categories>,
    pub text: FamilyParts<String>,
    pub multi_numeric: FamilyParts<Vec<f64>>,
    pub category_rows: FamilyParts<Categories>,
    pub numeric_rows: FamilyParts<f64>,
}

/// A rectangular dataset of observations (rows) annotated by five column
/// families and two row-annotation axes.
///
/// Rows are shared by every row-indexed family: the expression block, numeric,
/// categorical, text and multi-numeric columns. Category rows and numeric rows
/// run along the other axis and hold one value per expression column.
///
/// Structural mutations check their input first and leave the matrix
/// untouched on error. Raw cell accessors panic on out-of-range indices.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedMatrix {
    name: String,
    origin: String,
    row_count: usize,
    pub(crate) expression: ExpressionBlock,
    pub(crate) numeric: ColumnFamily<f64>,
    pub(crate) category: ColumnFamily<Categories>,
    pub(crate) text: ColumnFamily<String>,
    pub(crate) multi_numeric: ColumnFamily<Vec<f64>>,
    pub(crate) category_rows: ColumnFamily<Categories>,
    pub(crate) numeric_rows: ColumnFamily<f64>,
}

impl Default for AnnotatedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotatedMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::with_rows(0)
    }

    /// Create a matrix with `row_count` rows and no columns.
    pub fn with_rows(row_count: usize) -> Self {
        Self {
            name: String::new(),
            origin: String::new(),
            row_count,
            expression: ExpressionBlock::empty(row_count),
            numeric: ColumnFamily::new(Family::Numeric),
            category: ColumnFamily::new(Family::Category),
            text: ColumnFamily::new(Family::Text),
            multi_numeric: ColumnFamily::new(Family::MultiNumeric),
            category_rows: ColumnFamily::new(Family::CategoryRow),
            numeric_rows: ColumnFamily::new(Family::NumericRow),
        }
    }

    /// An empty matrix of the same configuration, for building derived results.
    pub fn create_new_instance(&self) -> Self {
        let mut instance = Self::new();
        instance.name = self.name.clone();
        instance.origin = self.origin.clone();
        instance
    }

    /// Replace every family at once.
    ///
    /// All parts are validated before anything is assigned, so a failed call
    /// leaves the matrix as it was.
    pub fn set_data(&mut self, parts: MatrixParts) -> Result<()> {
        let rows = parts.row_count;
        let expression = ExpressionBlock::from_parts(parts.expression, parts.quality, parts.imputed, rows)?;
        let n_cols = expression.n_cols();
        let numeric = ColumnFamily::from_parts(Family::Numeric, parts.numeric, rows)?;
        let category = ColumnFamily::from_parts(Family::Category, parts.category, rows)?;
        let text = ColumnFamily::from_parts(Family::Text, parts.text, rows)?;
        let multi_numeric = ColumnFamily::from_parts(Family::MultiNumeric, parts.multi_numeric, rows)?;
        let category_rows = ColumnFamily::from_parts(Family::CategoryRow, parts.category_rows, n_cols)?;
        let numeric_rows = ColumnFamily::from_parts(Family::NumericRow, parts.numeric_rows, n_cols)?;

        self.row_count = rows;
        self.expression = expression;
        self.numeric = numeric;
        self.category = category;
        self.text = text;
        self.multi_numeric = multi_numeric;
        self.category_rows = category_rows;
        self.numeric_rows = numeric_rows;
        Ok(())
    }

    /// Export the contents as plain parts.
    pub fn to_parts(&self) -> MatrixParts {
        let n_cols = self.expression_column_count();
        MatrixParts {
            row_count: self.row_count,
            expression: self.expression.to_parts(),
            quality: self.expression.quality_view().map(|q| {
                (0..n_cols)
                    .map(|j| q.column(j).iter().copied().collect())
                    .collect()
            }),
            imputed: self.expression.imputed_view().map(|m| {
                (0..n_cols)
                    .map(|j| m.column(j).iter().copied().collect())
                    .collect()
            }),
            numeric: self.numeric.to_parts(),
            category: self.category.to_parts(),
            text: self.text.to_parts(),
            multi_numeric: self.multi_numeric.to_parts(),
            category_rows: self.category_rows.to_parts(),
            numeric_rows: self.numeric_rows.to_parts(),
        }
    }

    /// Display name of the dataset.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the display name.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Where the data was loaded from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Record where the data came from.
    pub fn set_origin(&mut self, origin: &str) {
        self.origin = origin.to_string();
    }

    /// Number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of expression columns.
    #[inline]
    pub fn expression_column_count(&self) -> usize {
        self.expression.n_cols()
    }

    /// Check if any row-indexed family has a column.
    pub fn has_row_columns(&self) -> bool {
        self.expression.n_cols() > 0
            || !self.numeric.is_empty()
            || !self.category.is_empty()
            || !self.text.is_empty()
            || !self.multi_numeric.is_empty()
    }

    // ------------------------------------------------------------------
    // Expression family
    // ------------------------------------------------------------------

    /// Borrow the expression block.
    pub fn expression_block(&self) -> &ExpressionBlock {
        &self.expression
    }

    /// Expression column names.
    pub fn expression_names(&self) -> &[String] {
        self.expression.names()
    }

    /// Expression column descriptions.
    pub fn expression_descriptions(&self) -> &[String] {
        self.expression.descriptions()
    }

    /// Index of the expression column named `name`.
    pub fn expression_index(&self, name: &str) -> Option<usize> {
        self.expression.index_of(name)
    }

    /// Value at `(row, col)`. Panics when out of range.
    #[inline]
    pub fn expression(&self, row: usize, col: usize) -> f32 {
        self.expression.get(row, col)
    }

    /// Set the value at `(row, col)`. Panics when out of range.
    #[inline]
    pub fn set_expression(&mut self, row: usize, col: usize, value: f32) {
        self.expression.set(row, col, value);
    }

    /// Copy of one expression row.
    pub fn expression_row(&self, row: usize) -> Vec<f32> {
        self.expression.row(row)
    }

    /// Copy of one expression column.
    pub fn expression_column(&self, col: usize) -> Vec<f32> {
        self.expression.column(col)
    }

    /// Borrow one expression column.
    pub fn expression_column_view(&self, col: usize) -> &[f32] {
        self.expression.column_view(col)
    }

    /// Mutably borrow one expression column.
    pub fn expression_column_view_mut(&mut self, col: usize) -> &mut [f32] {
        self.expression.column_view_mut(col)
    }

    /// Borrow the whole expression matrix.
    pub fn expression_values_view(&self) -> &DMatrix<f32> {
        self.expression.values_view()
    }

    /// Mutably borrow the column-major expression buffer.
    pub fn expression_values_view_mut(&mut self) -> &mut [f32] {
        self.expression.values_view_mut()
    }

    /// Check if a quality matrix is attached.
    pub fn has_quality(&self) -> bool {
        self.expression.has_quality()
    }

    /// Quality of a cell, if a quality matrix is attached.
    pub fn quality(&self, row: usize, col: usize) -> Option<f32> {
        self.expression.quality(row, col)
    }

    /// Attach or drop the quality matrix.
    pub fn set_quality(&mut self, quality: Option<DMatrix<f32>>) -> Result<()> {
        self.expression.set_quality(quality)
    }

    /// Check if a cell was imputed.
    pub fn is_imputed(&self, row: usize, col: usize) -> bool {
        self.expression.is_imputed(row, col)
    }

    /// Flag a cell as imputed, attaching the imputation matrix on first use.
    pub fn set_imputed(&mut self, row: usize, col: usize, imputed: bool) {
        self.expression.set_imputed(row, col, imputed);
    }

    /// Attach or drop the imputation matrix.
    pub fn set_imputed_matrix(&mut self, imputed: Option<DMatrix<bool>>) -> Result<()> {
        self.expression.set_imputed_matrix(imputed)
    }

    /// Append an expression column.
    ///
    /// Every category row gains an empty label set and every numeric row a
    /// NaN for the new column.
    pub fn add_expression_column(
        &mut self,
        name: &str,
        description: &str,
        values: Vec<f32>,
    ) -> Result<()> {
        self.adopt_row_count(values.len());
        self.expression.push_column(name, description, &values)?;
        self.category_rows.append_cell(Categories::new());
        self.numeric_rows.append_cell(f64::NAN);
        Ok(())
    }

    /// Remove several expression columns, keeping the rest in order.
    pub fn remove_expression_columns(&mut self, indices: &[usize]) -> Result<()> {
        let n = self.expression_column_count();
        check_indices(indices, n, Family::Expression)?;
        let keep: Vec<usize> = (0..n).filter(|j| !indices.contains(j)).collect();
        self.select_expression_columns(&keep);
        Ok(())
    }

    /// Rename an expression column. Names stay unique.
    pub fn rename_expression_column(&mut self, col: usize, name: &str) -> Result<()> {
        self.expression.rename(col, name)
    }

    /// Replace a column description.
    pub fn set_expression_description(&mut self, col: usize, description: &str) -> Result<()> {
        self.expression.set_description(col, description)
    }

    // ------------------------------------------------------------------
    // Numeric family
    // ------------------------------------------------------------------

    /// Borrow the numeric family.
    pub fn numeric_columns(&self) -> &ColumnFamily<f64> {
        &self.numeric
    }

    /// Copy of one numeric column.
    pub fn numeric_column(&self, index: usize) -> Vec<f64> {
        self.numeric.column(index)
    }

    /// Borrow one numeric column.
    pub fn numeric_column_view(&self, index: usize) -> &[f64] {
        self.numeric.column_view(index)
    }

    /// Mutably borrow one numeric column.
    pub fn numeric_column_view_mut(&mut self, index: usize) -> &mut [f64] {
        self.numeric.column_view_mut(index)
    }

    /// Append a numeric column of `row_count` values.
    pub fn add_numeric_column(&mut self, name: &str, description: &str, values: Vec<f64>) -> Result<()> {
        let rows = self.rows_for(values.len());
        self.numeric.push(name, description, values, rows)?;
        self.commit_rows(rows);
        Ok(())
    }

    /// Replace the numeric column at `index`.
    pub fn set_numeric_column_at(
        &mut self,
        index: usize,
        name: &str,
        description: &str,
        values: Vec<f64>,
    ) -> Result<()> {
        self.numeric.set(index, name, description, values, self.row_count)
    }

    /// Remove the numeric column at `index`.
    pub fn remove_numeric_column_at(&mut self, index: usize) -> Result<()> {
        self.numeric.remove(index).map(|_| ())
    }

    /// Remove several numeric columns at once.
    pub fn remove_numeric_columns(&mut self, indices: &[usize]) -> Result<()> {
        self.numeric.remove_many(indices)
    }

    // ------------------------------------------------------------------
    // Categorical family
    // ------------------------------------------------------------------

    /// Borrow the categorical family.
    pub fn category_columns(&self) -> &ColumnFamily<Categories> {
        &self.category
    }

    /// Copy of one categorical column.
    pub fn category_column(&self, index: usize) -> Vec<Categories> {
        self.category.column(index)
    }

    /// Borrow one categorical column.
    pub fn category_column_view(&self, index: usize) -> &[Categories] {
        self.category.column_view(index)
    }

    /// Mutably borrow one categorical column.
    pub fn category_column_view_mut(&mut self, index: usize) -> &mut [Categories] {
        self.category.column_view_mut(index)
    }

    /// Append a categorical column.
    pub fn add_category_column(
        &mut self,
        name: &str,
        description: &str,
        values: Vec<Categories>,
    ) -> Result<()> {
        let rows = self.rows_for(values.len());
        self.category.push(name, description, values, rows)?;
        self.commit_rows(rows);
        Ok(())
    }

    /// Append several categorical columns. Either all are added or none.
    pub fn add_category_columns(&mut self, columns: FamilyParts<Categories>) -> Result<()> {
        let Some(first) = columns.columns.first() else {
            return Ok(());
        };
        let n = columns.columns.len();
        for len in [columns.names.len(), columns.descriptions.len()] {
            if len != n {
                return Err(MatrixError::DimensionMismatch {
                    family: Family::Category,
                    expected: n,
                    actual: len,
                });
            }
        }
        let rows = self.rows_for(first.len());
        let mut staged = self.category.clone();
        for ((name, description), values) in columns
            .names
            .iter()
            .zip(&columns.descriptions)
            .zip(columns.columns)
        {
            staged.push(name, description, values, rows)?;
        }
        self.category = staged;
        self.commit_rows(rows);
        Ok(())
    }

    /// Replace the categorical column at `index`.
    pub fn set_category_column_at(
        &mut self,
        index: usize,
        name: &str,
        description: &str,
        values: Vec<Categories>,
    ) -> Result<()> {
        self.category.set(index, name, description, values, self.row_count)
    }

    /// Remove the categorical column at `index`.
    pub fn remove_category_column_at(&mut self, index: usize) -> Result<()> {
        self.category.remove(index).map(|_| ())
    }

    /// Remove several categorical columns at once.
    pub fn remove_category_columns(&mut self, indices: &[usize]) -> Result<()> {
        self.category.remove_many(indices)
    }

    // ------------------------------------------------------------------
    // Text family
    // ------------------------------------------------------------------

    /// Borrow the text family.
    pub fn text_columns(&self) -> &ColumnFamily<String> {
        &self.text
    }

    /// Copy of one text column.
    pub fn text_column(&self, index: usize) -> Vec<String> {
        self.text.column(index)
    }

    /// Borrow one text column.
    pub fn text_column_view(&self, index: usize) -> &[String] {
        self.text.column_view(index)
    }

    /// Mutably borrow one text column.
    pub fn text_column_view_mut(&mut self, index: usize) -> &mut [String] {
        self.text.column_view_mut(index)
    }

    /// Append a text column.
    pub fn add_text_column(&mut self, name: &str, description: &str, values: Vec<String>) -> Result<()> {
        let rows = self.rows_for(values.len());
        self.text.push(name, description, values, rows)?;
        self.commit_rows(rows);
        Ok(())
    }

    /// Replace the text column at `index`.
    pub fn set_text_column_at(
        &mut self,
        index: usize,
        name: &str,
        description: &str,
        values: Vec<String>,
    ) -> Result<()> {
        self.text.set(index, name, description, values, self.row_count)
    }

    /// Remove the text column at `index`.
    pub fn remove_text_column_at(&mut self, index: usize) -> Result<()> {
        self.text.remove(index).map(|_| ())
    }

    /// Remove several text columns at once.
    pub fn remove_text_columns(&mut self, indices: &[usize]) -> Result<()> {
        self.text.remove_many(indices)
    }

    // ------------------------------------------------------------------
    // Multi-numeric family
    // ------------------------------------------------------------------

    /// Borrow the multi-numeric family.
    pub fn multi_numeric_columns(&self) -> &ColumnFamily<Vec<f64>> {
        &self.multi_numeric
    }

    /// Copy of one multi-numeric column.
    pub fn multi_numeric_column(&self, index: usize) -> Vec<Vec<f64>> {
        self.multi_numeric.column(index)
    }

    /// Borrow one multi-numeric column.
    pub fn multi_numeric_column_view(&self, index: usize) -> &[Vec<f64>] {
        self.multi_numeric.column_view(index)
    }

    /// Append a multi-numeric column.
    pub fn add_multi_numeric_column(
        &mut self,
        name: &str,
        description: &str,
        values: Vec<Vec<f64>>,
    ) -> Result<()> {
        let rows = self.rows_for(values.len());
        self.multi_numeric.push(name, description, values, rows)?;
        self.commit_rows(rows);
        Ok(())
    }

    /// Replace the multi-numeric column at `index`.
    pub fn set_multi_numeric_column_at(
        &mut self,
        index: usize,
        name: &str,
        description: &str,
        values: Vec<Vec<f64>>,
    ) -> Result<()> {
        self.multi_numeric
            .set(index, name, description, values, self.row_count)
    }

    /// Remove the multi-numeric column at `index`.
    pub fn remove_multi_numeric_column_at(&mut self, index: usize) -> Result<()> {
        self.multi_numeric.remove(index).map(|_| ())
    }

    /// Remove several multi-numeric columns at once.
    pub fn remove_multi_numeric_columns(&mut self, indices: &[usize]) -> Result<()> {
        self.multi_numeric.remove_many(indices)
    }

    // ------------------------------------------------------------------
    // Names and descriptions
    // ------------------------------------------------------------------

    /// Rename a numeric column. Names stay unique.
    pub fn rename_numeric_column(&mut self, index: usize, name: &str) -> Result<()> {
        self.numeric.rename(index, name)
    }

    /// Replace a column description.
    pub fn set_numeric_description(&mut self, index: usize, description: &str) -> Result<()> {
        self.numeric.set_description(index, description)
    }

    /// Rename a categorical column.
    pub fn rename_category_column(&mut self, index: usize, name: &str) -> Result<()> {
        self.category.rename(index, name)
    }

    /// Replace a column description.
    pub fn set_category_description(&mut self, index: usize, description: &str) -> Result<()> {
        self.category.set_description(index, description)
    }

    /// Rename a text column.
    pub fn rename_text_column(&mut self, index: usize, name: &str) -> Result<()> {
        self.text.rename(index, name)
    }

    /// Replace a column description.
    pub fn set_text_description(&mut self, index: usize, description: &str) -> Result<()> {
        self.text.set_description(index, description)
    }

    /// Rename a multi-numeric column.
    pub fn rename_multi_numeric_column(&mut self, index: usize, name: &str) -> Result<()> {
        self.multi_numeric.rename(index, name)
    }

    /// Replace a column description.
    pub fn set_multi_numeric_description(&mut self, index: usize, description: &str) -> Result<()> {
        self.multi_numeric.set_description(index, description)
    }

    // ------------------------------------------------------------------
    // Extraction
    // ------------------------------------------------------------------

    /// Keep the rows listed in `order`, in that order.
    ///
    /// Duplicates and omissions are both allowed, so this covers filtering,
    /// permutation and resampling. Every row-indexed family is rebuilt with
    /// the same index list.
    pub fn extract_expression_rows(&mut self, order: &[usize]) -> Result<()> {
        check_indices(order, self.row_count, Family::Expression)?;
        self.expression.select_rows(order);
        self.numeric.select(order);
        self.category.select(order);
        self.text.select(order);
        self.multi_numeric.select(order);
        self.row_count = order.len();
        Ok(())
    }

    /// Keep the expression columns listed in `order`, in that order.
    ///
    /// Quality, imputation flags and every row-annotation entry follow.
    /// Column names stay unique, so an index listed twice is rejected.
    pub fn extract_expression_columns(&mut self, order: &[usize]) -> Result<()> {
        check_indices(order, self.expression_column_count(), Family::Expression)?;
        let mut seen = HashSet::with_capacity(order.len());
        if let Some(&repeated) = order.iter().find(|&&j| !seen.insert(j)) {
            return Err(MatrixError::AmbiguousSelection(repeated));
        }
        self.select_expression_columns(order);
        Ok(())
    }

    fn select_expression_columns(&mut self, order: &[usize]) {
        self.expression.select_columns(order);
        self.category_rows.select(order);
        self.numeric_rows.select(order);
    }

    /// Row count to validate a new column against. An empty matrix adopts
    /// the length of its first column.
    fn rows_for(&self, len: usize) -> usize {
        if self.row_count == 0 && !self.has_row_columns() {
            len
        } else {
            self.row_count
        }
    }

    fn adopt_row_count(&mut self, len: usize) {
        if self.row_count == 0 && !self.has_row_columns() && len > 0 {
            self.commit_rows(len);
        }
    }

    /// Record the row count after a column was added. The expression block
    /// has no columns whenever the count changes here.
    fn commit_rows(&mut self, rows: usize) {
        if self.row_count != rows {
            self.row_count = rows;
            self.expression = ExpressionBlock::empty(rows);
        }
    }
}

/// Check that every index is below `len`.
pub(crate) fn check_indices(indices: &[usize], len: usize, family: Family) -> Result<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&index) => Err(MatrixError::IndexOutOfRange { family, index, len }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cell::categories;

    fn create_test_matrix() -> AnnotatedMatrix {
        let mut matrix = AnnotatedMatrix::new();
        matrix
            .add_expression_column("S1", "sample 1", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        matrix
            .add_expression_column("S2", "sample 2", vec![5.0, 6.0, 7.0, 8.0])
            .unwrap();
        matrix
            .add_expression_column("S3", "sample 3", vec![9.0, 10.0, 11.0, 12.0])
            .unwrap();
        matrix
            .add_numeric_column("Score", "", vec![0.1, 0.2, 0.3, 0.4])
            .unwrap();
        matrix
            .add_text_column(
                "Protein",
                "",
                vec!["P1".into(), "P2".into(), "P3".into(), "P4".into()],
            )
            .unwrap();
        matrix
            .add_category_column(
                "Contaminant",
                "",
                vec![
                    categories(["+"]),
                    Categories::new(),
                    Categories::new(),
                    categories(["+"]),
                ],
            )
            .unwrap();
        matrix
            .add_multi_numeric_column(
                "Positions",
                "",
                vec![vec![1.0], vec![2.0, 3.0], vec![], vec![4.0]],
            )
            .unwrap();
        matrix
            .add_category_row(
                "Group",
                "",
                vec![categories(["A"]), categories(["A"]), categories(["B"])],
            )
            .unwrap();
        matrix
            .add_numeric_row("Time", "", vec![0.0, 1.0, 2.0])
            .unwrap();
        matrix
    }

    #[test]
    fn test_dimensions() {
        let matrix = create_test_matrix();
        assert_eq!(matrix.row_count(), 4);
        assert_eq!(matrix.expression_column_count(), 3);
        assert_eq!(matrix.expression(2, 1), 7.0);
        assert_eq!(matrix.expression_row(0), vec![1.0, 5.0, 9.0]);
        assert_eq!(matrix.expression_column(2), vec![9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_copies_do_not_write_through() {
        let matrix = create_test_matrix();
        let mut row = matrix.expression_row(0);
        row[0] = 100.0;
        assert_eq!(matrix.expression(0, 0), 1.0);
    }

    #[test]
    fn test_views_write_through() {
        let mut matrix = create_test_matrix();
        matrix.expression_column_view_mut(1)[3] = -1.0;
        assert_eq!(matrix.expression(3, 1), -1.0);
        matrix.numeric_column_view_mut(0)[0] = 9.0;
        assert_eq!(matrix.numeric_column_view(0)[0], 9.0);
    }

    #[test]
    fn test_add_column_length_mismatch() {
        let mut matrix = create_test_matrix();
        let err = matrix
            .add_numeric_column("Short", "", vec![1.0, 2.0])
            .unwrap_err();
        assert!(matches!(
            err,
            MatrixError::DimensionMismatch { expected: 4, actual: 2, .. }
        ));
        assert!(matrix
            .add_expression_column("S4", "", vec![0.0; 3])
            .is_err());
        assert_eq!(matrix.expression_column_count(), 3);
        assert_eq!(matrix.category_row(0).len(), 3);
    }

    #[test]
    fn test_family_name_uniqueness() {
        let mut matrix = AnnotatedMatrix::new();
        matrix.add_numeric_column("X", "", vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            matrix.add_numeric_column("X", "", vec![3.0, 4.0]),
            Err(MatrixError::DuplicateName { family: Family::Numeric, .. })
        ));
        matrix
            .add_text_column("X", "", vec!["a".into(), "b".into()])
            .unwrap();
        assert_eq!(matrix.numeric_columns().len(), 1);
        assert_eq!(matrix.text_columns().len(), 1);
    }

    #[test]
    fn test_rename_and_describe() {
        let mut matrix = create_test_matrix();
        matrix.rename_numeric_column(0, "Andromeda").unwrap();
        matrix.set_text_description(0, "leading protein").unwrap();
        assert_eq!(matrix.numeric_columns().names(), &["Andromeda"]);
        assert_eq!(matrix.text_columns().description(0), "leading protein");
        matrix.add_numeric_column("Other", "", vec![0.0; 4]).unwrap();
        assert!(matrix.rename_numeric_column(1, "Andromeda").is_err());
        assert!(matrix.rename_category_column(3, "x").is_err());
        matrix.rename_multi_numeric_column(0, "Sites").unwrap();
        assert_eq!(matrix.multi_numeric_columns().names(), &["Sites"]);
    }

    #[test]
    fn test_expression_after_annotation_column() {
        let mut matrix = AnnotatedMatrix::new();
        matrix
            .add_text_column("Protein", "", vec!["P1".into(), "P2".into()])
            .unwrap();
        assert_eq!(matrix.row_count(), 2);
        matrix.add_expression_column("S1", "", vec![1.0, 2.0]).unwrap();
        assert_eq!(matrix.expression(1, 0), 2.0);
        assert!(matrix.add_expression_column("S2", "", vec![1.0]).is_err());
    }

    #[test]
    fn test_add_category_columns_is_atomic() {
        let mut matrix = create_test_matrix();
        let mut batch = FamilyParts::default();
        batch.push("New", "", vec![Categories::new(); 4]);
        batch.push("Contaminant", "", vec![Categories::new(); 4]);
        assert!(matrix.add_category_columns(batch).is_err());
        assert_eq!(matrix.category_columns().len(), 1);

        let mut batch = FamilyParts::default();
        batch.push("New", "", vec![Categories::new(); 4]);
        batch.push("Other", "", vec![categories(["x"]); 4]);
        matrix.add_category_columns(batch).unwrap();
        assert_eq!(matrix.category_columns().names(), &["Contaminant", "New", "Other"]);
    }

    #[test]
    fn test_set_and_remove_category_column() {
        let mut matrix = create_test_matrix();
        matrix
            .set_category_column_at(0, "Reverse", "", vec![categories(["+"]); 4])
            .unwrap();
        assert_eq!(matrix.category_columns().names(), &["Reverse"]);
        assert!(matrix.remove_category_column_at(1).is_err());
        matrix.remove_category_column_at(0).unwrap();
        assert!(matrix.category_columns().is_empty());
        assert_eq!(matrix.row_count(), 4);
    }

    #[test]
    fn test_extract_rows_scenario() {
        let mut matrix = AnnotatedMatrix::new();
        matrix
            .add_expression_column("v", "", vec![1.0, f32::NAN, 3.0])
            .unwrap();
        matrix.extract_expression_rows(&[2, 0]).unwrap();
        assert_eq!(matrix.row_count(), 2);
        assert_eq!(matrix.expression_column(0), vec![3.0, 1.0]);
    }

    #[test]
    fn test_extract_rows_is_index_faithful() {
        let mut original = create_test_matrix();
        original
            .set_quality(Some(DMatrix::from_fn(4, 3, |i, j| (10 * i + j) as f32)))
            .unwrap();
        original.set_imputed(3, 1, true);
        let mut matrix = original.clone();
        let order = [3, 3, 1];
        matrix.extract_expression_rows(&order).unwrap();

        assert_eq!(matrix.row_count(), order.len());
        for (i, &o) in order.iter().enumerate() {
            assert_eq!(matrix.expression_row(i), original.expression_row(o));
            for j in 0..matrix.expression_column_count() {
                assert_eq!(matrix.quality(i, j), original.quality(o, j));
                assert_eq!(matrix.is_imputed(i, j), original.is_imputed(o, j));
            }
            assert_eq!(matrix.numeric_column_view(0)[i], original.numeric_column_view(0)[o]);
            assert_eq!(matrix.text_column_view(0)[i], original.text_column_view(0)[o]);
            assert_eq!(
                matrix.category_column_view(0)[i],
                original.category_column_view(0)[o]
            );
            assert_eq!(
                matrix.multi_numeric_column_view(0)[i],
                original.multi_numeric_column_view(0)[o]
            );
        }
        // Row annotations are untouched by row extraction.
        assert_eq!(matrix.category_row(0), original.category_row(0));
    }

    #[test]
    fn test_extract_rows_out_of_range_leaves_matrix() {
        let original = create_test_matrix();
        let mut matrix = original.clone();
        assert!(matches!(
            matrix.extract_expression_rows(&[0, 4]),
            Err(MatrixError::IndexOutOfRange { index: 4, len: 4, .. })
        ));
        assert_eq!(matrix, original);
    }

    #[test]
    fn test_extract_columns_keeps_shapes_aligned() {
        let mut matrix = create_test_matrix();
        matrix.set_imputed(0, 2, true);
        matrix
            .set_quality(Some(DMatrix::from_element(4, 3, 1.0)))
            .unwrap();
        matrix.extract_expression_columns(&[2, 0]).unwrap();

        assert_eq!(matrix.expression_column_count(), 2);
        assert_eq!(matrix.expression_names(), &["S3", "S1"]);
        assert!(matrix.is_imputed(0, 0));
        assert!(!matrix.is_imputed(0, 1));
        assert_eq!(matrix.expression_block().quality_view().unwrap().shape(), (4, 2));
        assert_eq!(
            matrix.category_row(0),
            &[categories(["B"]), categories(["A"])]
        );
        assert_eq!(matrix.numeric_row(0), &[2.0, 0.0]);
        assert_eq!(matrix.row_count(), 4);
    }

    #[test]
    fn test_extract_columns_rejects_repeated_index() {
        let original = create_test_matrix();
        let mut matrix = original.clone();
        assert!(matches!(
            matrix.extract_expression_columns(&[0, 0]),
            Err(MatrixError::AmbiguousSelection(0))
        ));
        assert_eq!(matrix, original);

        // The matrix still rebuilds from its own parts.
        matrix.extract_expression_columns(&[1, 0]).unwrap();
        let mut rebuilt = AnnotatedMatrix::new();
        rebuilt.set_data(matrix.to_parts()).unwrap();
        assert_eq!(rebuilt.expression_names(), &["S2", "S1"]);
    }

    #[test]
    fn test_remove_expression_columns() {
        let mut matrix = create_test_matrix();
        matrix.remove_expression_columns(&[1]).unwrap();
        assert_eq!(matrix.expression_names(), &["S1", "S3"]);
        assert_eq!(matrix.numeric_row(0), &[0.0, 2.0]);
        assert!(matrix.remove_expression_columns(&[5]).is_err());
    }

    #[test]
    fn test_clone_is_deep() {
        let original = create_test_matrix();
        let snapshot = original.clone();
        let mut copy = original.clone();

        copy.set_expression(0, 0, 42.0);
        copy.numeric_column_view_mut(0)[1] = 42.0;
        copy.text_column_view_mut(0)[0] = "changed".into();
        copy.category_column_view_mut(0)[1].insert("new".into());
        copy.set_imputed(1, 1, true);
        copy.extract_expression_rows(&[0]).unwrap();
        copy.remove_category_row_at(0).unwrap();

        assert_eq!(original, snapshot);
        assert!(!original.is_imputed(1, 1));
    }

    #[test]
    fn test_create_new_instance() {
        let mut matrix = create_test_matrix();
        matrix.set_name("proteins");
        matrix.set_origin("/data/proteinGroups.txt");
        let instance = matrix.create_new_instance();
        assert_eq!(instance.row_count(), 0);
        assert!(!instance.has_row_columns());
        assert_eq!(instance.name(), "proteins");
        assert_eq!(instance.origin(), "/data/proteinGroups.txt");
    }

    #[test]
    fn test_set_data_roundtrip_and_atomicity() {
        let matrix = create_test_matrix();
        let mut rebuilt = AnnotatedMatrix::new();
        rebuilt.set_data(matrix.to_parts()).unwrap();
        assert_eq!(rebuilt, matrix);

        let mut parts = matrix.to_parts();
        parts.numeric_rows.columns[0].pop();
        let before = rebuilt.clone();
        assert!(rebuilt.set_data(parts).is_err());
        assert_eq!(rebuilt, before);
    }

    #[test]
    #[should_panic]
    fn test_expression_cell_out_of_range() {
        let matrix = create_test_matrix();
        matrix.expression(0, 3);
    }

    #[test]
    fn test_extract_all_rows_then_add_column_fails() {
        let mut matrix = create_test_matrix();
        matrix.extract_expression_rows(&[]).unwrap();
        assert_eq!(matrix.row_count(), 0);
        assert!(matrix.add_numeric_column("Late", "", vec![1.0]).is_err());
        matrix.add_numeric_column("Late", "", Vec::new()).unwrap();
    }
}
