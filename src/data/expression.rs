//! The expression block: the main float matrix and its side channels.

use crate::data::family::{Family, FamilyParts};
use crate::error::{MatrixError, Result};
use nalgebra::DMatrix;
use std::collections::HashSet;

/// Expression values (rows × expression columns) with optional quality and
/// imputation matrices of identical shape.
///
/// Storage is column-major, so a single expression column is a contiguous
/// slice of the backing buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionBlock {
    names: Vec<String>,
    descriptions: Vec<String>,
    values: DMatrix<f32>,
    quality: Option<DMatrix<f32>>,
    imputed: Option<DMatrix<bool>>,
}

impl ExpressionBlock {
    /// Create a block with `n_rows` rows and no columns.
    pub fn empty(n_rows: usize) -> Self {
        Self {
            names: Vec::new(),
            descriptions: Vec::new(),
            values: DMatrix::zeros(n_rows, 0),
            quality: None,
            imputed: None,
        }
    }

    /// Build a block from column vectors, checking every shape.
    pub fn from_parts(
        parts: FamilyParts<f32>,
        quality: Option<Vec<Vec<f32>>>,
        imputed: Option<Vec<Vec<bool>>>,
        n_rows: usize,
    ) -> Result<Self> {
        let n_cols = parts.columns.len();
        for len in [parts.names.len(), parts.descriptions.len()] {
            if len != n_cols {
                return Err(mismatch(n_cols, len));
            }
        }
        let mut seen = HashSet::with_capacity(n_cols);
        for name in &parts.names {
            if !seen.insert(name.as_str()) {
                return Err(MatrixError::DuplicateName {
                    family: Family::Expression,
                    name: name.clone(),
                });
            }
        }
        let values = columns_to_matrix(&parts.columns, n_rows)?;
        let quality = match quality {
            Some(q) => Some(side_matrix(&q, n_rows, n_cols)?),
            None => None,
        };
        let imputed = match imputed {
            Some(m) => Some(side_matrix(&m, n_rows, n_cols)?),
            None => None,
        };
        Ok(Self {
            names: parts.names,
            descriptions: parts.descriptions,
            values,
            quality,
            imputed,
        })
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of expression columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    /// Column names.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column descriptions.
    #[inline]
    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    /// Position of the column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.check_cell(row, col);
        self.values[(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.check_cell(row, col);
        self.values[(row, col)] = value;
    }

    /// Copy of one row.
    pub fn row(&self, row: usize) -> Vec<f32> {
        assert!(
            row < self.n_rows(),
            "expression row {} out of range for {} rows",
            row,
            self.n_rows()
        );
        self.values.row(row).iter().copied().collect()
    }

    /// Copy of one column.
    pub fn column(&self, col: usize) -> Vec<f32> {
        self.column_view(col).to_vec()
    }

    /// Borrow one column as a contiguous slice.
    pub fn column_view(&self, col: usize) -> &[f32] {
        self.check_col(col);
        let n = self.n_rows();
        &self.values.as_slice()[col * n..(col + 1) * n]
    }

    /// Mutably borrow one column as a contiguous slice.
    pub fn column_view_mut(&mut self, col: usize) -> &mut [f32] {
        self.check_col(col);
        let n = self.n_rows();
        &mut self.values.as_mut_slice()[col * n..(col + 1) * n]
    }

    /// Borrow the whole value matrix.
    #[inline]
    pub fn values_view(&self) -> &DMatrix<f32> {
        &self.values
    }

    /// Mutably borrow the column-major value buffer. The shape cannot change.
    #[inline]
    pub fn values_view_mut(&mut self) -> &mut [f32] {
        self.values.as_mut_slice()
    }

    /// Check if a quality matrix is attached.
    #[inline]
    pub fn has_quality(&self) -> bool {
        self.quality.is_some()
    }

    /// Quality of a cell, if a quality matrix is attached.
    pub fn quality(&self, row: usize, col: usize) -> Option<f32> {
        self.check_cell(row, col);
        self.quality.as_ref().map(|q| q[(row, col)])
    }

    /// Borrow the quality matrix.
    pub fn quality_view(&self) -> Option<&DMatrix<f32>> {
        self.quality.as_ref()
    }

    /// Attach or drop the quality matrix.
    pub fn set_quality(&mut self, quality: Option<DMatrix<f32>>) -> Result<()> {
        if let Some(q) = &quality {
            self.check_shape(q.nrows(), q.ncols())?;
        }
        self.quality = quality;
        Ok(())
    }

    /// Check if an imputation matrix is attached.
    #[inline]
    pub fn has_imputed(&self) -> bool {
        self.imputed.is_some()
    }

    /// Whether a cell was imputed. Without an imputation matrix nothing is.
    pub fn is_imputed(&self, row: usize, col: usize) -> bool {
        self.check_cell(row, col);
        self.imputed.as_ref().is_some_and(|m| m[(row, col)])
    }

    /// Flag a cell as imputed or measured, attaching the matrix on first use.
    pub fn set_imputed(&mut self, row: usize, col: usize, imputed: bool) {
        self.check_cell(row, col);
        let (n_rows, n_cols) = (self.n_rows(), self.n_cols());
        let matrix = self
            .imputed
            .get_or_insert_with(|| DMatrix::from_element(n_rows, n_cols, false));
        matrix[(row, col)] = imputed;
    }

    /// Borrow the imputation matrix.
    pub fn imputed_view(&self) -> Option<&DMatrix<bool>> {
        self.imputed.as_ref()
    }

    /// Attach or drop the imputation matrix.
    pub fn set_imputed_matrix(&mut self, imputed: Option<DMatrix<bool>>) -> Result<()> {
        if let Some(m) = &imputed {
            self.check_shape(m.nrows(), m.ncols())?;
        }
        self.imputed = imputed;
        Ok(())
    }

    /// Append a column. Quality becomes NaN and imputed false for it.
    pub fn push_column(&mut self, name: &str, description: &str, values: &[f32]) -> Result<()> {
        if values.len() != self.n_rows() {
            return Err(mismatch(self.n_rows(), values.len()));
        }
        if self.index_of(name).is_some() {
            return Err(MatrixError::DuplicateName {
                family: Family::Expression,
                name: name.to_string(),
            });
        }
        let col = self.n_cols();
        let old = std::mem::replace(&mut self.values, DMatrix::zeros(0, 0));
        let mut grown = old.insert_column(col, 0.0);
        grown.column_mut(col).copy_from_slice(values);
        self.values = grown;
        if let Some(q) = self.quality.take() {
            self.quality = Some(q.insert_column(col, f32::NAN));
        }
        if let Some(m) = self.imputed.take() {
            self.imputed = Some(m.insert_column(col, false));
        }
        self.names.push(name.to_string());
        self.descriptions.push(description.to_string());
        Ok(())
    }

    /// Rename the column at `col`.
    pub fn rename(&mut self, col: usize, name: &str) -> Result<()> {
        if col >= self.n_cols() {
            return Err(out_of_range(col, self.n_cols()));
        }
        if self.index_of(name).is_some_and(|i| i != col) {
            return Err(MatrixError::DuplicateName {
                family: Family::Expression,
                name: name.to_string(),
            });
        }
        self.names[col] = name.to_string();
        Ok(())
    }

    /// Replace the description of the column at `col`.
    pub fn set_description(&mut self, col: usize, description: &str) -> Result<()> {
        if col >= self.n_cols() {
            return Err(out_of_range(col, self.n_cols()));
        }
        self.descriptions[col] = description.to_string();
        Ok(())
    }

    /// Rebuild rows in `order`. Callers validate the indices.
    pub(crate) fn select_rows(&mut self, order: &[usize]) {
        let n_cols = self.n_cols();
        let pick = |m: &DMatrix<f32>| DMatrix::from_fn(order.len(), n_cols, |i, j| m[(order[i], j)]);
        self.values = pick(&self.values);
        self.quality = self.quality.as_ref().map(pick);
        self.imputed = self
            .imputed
            .as_ref()
            .map(|m| DMatrix::from_fn(order.len(), n_cols, |i, j| m[(order[i], j)]));
    }

    /// Rebuild columns in `order`. Callers validate the indices.
    pub(crate) fn select_columns(&mut self, order: &[usize]) {
        let n_rows = self.n_rows();
        let pick = |m: &DMatrix<f32>| DMatrix::from_fn(n_rows, order.len(), |i, j| m[(i, order[j])]);
        self.values = pick(&self.values);
        self.quality = self.quality.as_ref().map(pick);
        self.imputed = self
            .imputed
            .as_ref()
            .map(|m| DMatrix::from_fn(n_rows, order.len(), |i, j| m[(i, order[j])]));
        self.names = order.iter().map(|&j| self.names[j].clone()).collect();
        self.descriptions = order.iter().map(|&j| self.descriptions[j].clone()).collect();
    }

    /// Export as plain column vectors.
    pub(crate) fn to_parts(&self) -> FamilyParts<f32> {
        FamilyParts {
            names: self.names.clone(),
            descriptions: self.descriptions.clone(),
            columns: (0..self.n_cols()).map(|j| self.column(j)).collect(),
        }
    }

    fn check_cell(&self, row: usize, col: usize) {
        assert!(
            row < self.n_rows() && col < self.n_cols(),
            "expression cell ({}, {}) out of range for {} x {} matrix",
            row,
            col,
            self.n_rows(),
            self.n_cols()
        );
    }

    fn check_col(&self, col: usize) {
        assert!(
            col < self.n_cols(),
            "expression column {} out of range for {} columns",
            col,
            self.n_cols()
        );
    }

    fn check_shape(&self, n_rows: usize, n_cols: usize) -> Result<()> {
        if n_rows != self.n_rows() {
            return Err(mismatch(self.n_rows(), n_rows));
        }
        if n_cols != self.n_cols() {
            return Err(mismatch(self.n_cols(), n_cols));
        }
        Ok(())
    }
}

fn mismatch(expected: usize, actual: usize) -> MatrixError {
    MatrixError::DimensionMismatch {
        family: Family::Expression,
        expected,
        actual,
    }
}

fn out_of_range(index: usize, len: usize) -> MatrixError {
    MatrixError::IndexOutOfRange {
        family: Family::Expression,
        index,
        len,
    }
}

fn columns_to_matrix(columns: &[Vec<f32>], n_rows: usize) -> Result<DMatrix<f32>> {
    for column in columns {
        if column.len() != n_rows {
            return Err(mismatch(n_rows, column.len()));
        }
    }
    Ok(DMatrix::from_fn(n_rows, columns.len(), |i, j| columns[j][i]))
}

fn side_matrix<T>(columns: &[Vec<T>], n_rows: usize, n_cols: usize) -> Result<DMatrix<T>>
where
    T: nalgebra::Scalar + Copy,
{
    if columns.len() != n_cols {
        return Err(mismatch(n_cols, columns.len()));
    }
    for column in columns {
        if column.len() != n_rows {
            return Err(mismatch(n_rows, column.len()));
        }
    }
    Ok(DMatrix::from_fn(n_rows, n_cols, |i, j| columns[j][i]))
}
