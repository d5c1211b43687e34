//! Homogeneous column families with parallel names and descriptions.

use crate::error::{MatrixError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The kind of data a family holds.
///
/// Row-indexed families hold one cell per matrix row; the two row-annotation
/// kinds hold one cell per expression column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Expression,
    Numeric,
    Category,
    Text,
    MultiNumeric,
    CategoryRow,
    NumericRow,
}

impl Family {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Expression => "expression",
            Self::Numeric => "numeric",
            Self::Category => "categorical",
            Self::Text => "text",
            Self::MultiNumeric => "multi-numeric",
            Self::CategoryRow => "category row",
            Self::NumericRow => "numeric row",
        }
    }

    /// Single-letter code used in `Type` annotation rows.
    pub fn type_code(&self) -> Option<&'static str> {
        match self {
            Self::Expression => Some("E"),
            Self::Numeric => Some("N"),
            Self::Category => Some("C"),
            Self::Text => Some("T"),
            Self::MultiNumeric => Some("M"),
            Self::CategoryRow | Self::NumericRow => None,
        }
    }

    /// Parse a `Type` annotation code.
    pub fn from_type_code(code: &str) -> Option<Self> {
        match code.trim() {
            "E" | "e" => Some(Self::Expression),
            "N" | "n" => Some(Self::Numeric),
            "C" | "c" => Some(Self::Category),
            "T" | "t" => Some(Self::Text),
            "M" | "m" => Some(Self::MultiNumeric),
            _ => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Plain contents of a family, used for bulk construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyParts<T> {
    pub names: Vec<String>,
    pub descriptions: Vec<String>,
    pub columns: Vec<Vec<T>>,
}

impl<T> Default for FamilyParts<T> {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            descriptions: Vec::new(),
            columns: Vec::new(),
        }
    }
}

impl<T> FamilyParts<T> {
    /// Append one column.
    pub fn push(&mut self, name: impl Into<String>, description: impl Into<String>, column: Vec<T>) {
        self.names.push(name.into());
        self.descriptions.push(description.into());
        self.columns.push(column);
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A family of named columns sharing one cell type.
///
/// Every column holds the same number of cells. The family does not know that
/// number itself; callers pass the expected length to every mutation so that
/// the owning matrix stays the single source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFamily<T> {
    kind: Family,
    names: Vec<String>,
    descriptions: Vec<String>,
    columns: Vec<Vec<T>>,
}

impl<T: Clone> ColumnFamily<T> {
    /// Create an empty family.
    pub fn new(kind: Family) -> Self {
        Self {
            kind,
            names: Vec::new(),
            descriptions: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Build a family from plain parts, checking every invariant.
    pub fn from_parts(kind: Family, parts: FamilyParts<T>, expected_len: usize) -> Result<Self> {
        let n = parts.columns.len();
        for len in [parts.names.len(), parts.descriptions.len()] {
            if len != n {
                return Err(MatrixError::DimensionMismatch {
                    family: kind,
                    expected: n,
                    actual: len,
                });
            }
        }
        for column in &parts.columns {
            if column.len() != expected_len {
                return Err(MatrixError::DimensionMismatch {
                    family: kind,
                    expected: expected_len,
                    actual: column.len(),
                });
            }
        }
        let mut seen = HashSet::with_capacity(n);
        for name in &parts.names {
            if !seen.insert(name.as_str()) {
                return Err(MatrixError::DuplicateName {
                    family: kind,
                    name: name.clone(),
                });
            }
        }
        Ok(Self {
            kind,
            names: parts.names,
            descriptions: parts.descriptions,
            columns: parts.columns,
        })
    }

    /// Copy out the plain parts.
    pub fn to_parts(&self) -> FamilyParts<T> {
        FamilyParts {
            names: self.names.clone(),
            descriptions: self.descriptions.clone(),
            columns: self.columns.clone(),
        }
    }

    /// Kind of this family.
    #[inline]
    pub fn kind(&self) -> Family {
        self.kind
    }

    /// Number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the family has no columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
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

    /// Name of the column at `index`.
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Description of the column at `index`.
    pub fn description(&self, index: usize) -> &str {
        &self.descriptions[index]
    }

    /// Position of the column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Check if a column called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Borrow the cells of one column.
    pub fn column_view(&self, index: usize) -> &[T] {
        &self.columns[index]
    }

    /// Mutably borrow the cells of one column. The length cannot change.
    pub fn column_view_mut(&mut self, index: usize) -> &mut [T] {
        &mut self.columns[index]
    }

    /// Copy of one column.
    pub fn column(&self, index: usize) -> Vec<T> {
        self.columns[index].clone()
    }

    /// A single cell addressed as `(column, position)`.
    pub fn cell(&self, column: usize, position: usize) -> &T {
        &self.columns[column][position]
    }

    /// Iterate over `(name, description, cells)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &[T])> + '_ {
        self.names
            .iter()
            .zip(&self.descriptions)
            .zip(&self.columns)
            .map(|((n, d), c)| (n.as_str(), d.as_str(), c.as_slice()))
    }

    /// Append a column.
    pub fn push(
        &mut self,
        name: &str,
        description: &str,
        values: Vec<T>,
        expected_len: usize,
    ) -> Result<()> {
        self.check_len(values.len(), expected_len)?;
        if self.contains(name) {
            return Err(self.duplicate(name));
        }
        self.names.push(name.to_string());
        self.descriptions.push(description.to_string());
        self.columns.push(values);
        Ok(())
    }

    /// Replace the column at `index`.
    pub fn set(
        &mut self,
        index: usize,
        name: &str,
        description: &str,
        values: Vec<T>,
        expected_len: usize,
    ) -> Result<()> {
        self.check_index(index)?;
        self.check_len(values.len(), expected_len)?;
        if self.index_of(name).is_some_and(|i| i != index) {
            return Err(self.duplicate(name));
        }
        self.names[index] = name.to_string();
        self.descriptions[index] = description.to_string();
        self.columns[index] = values;
        Ok(())
    }

    /// Remove the column at `index` and return its parts.
    pub fn remove(&mut self, index: usize) -> Result<(String, String, Vec<T>)> {
        self.check_index(index)?;
        Ok((
            self.names.remove(index),
            self.descriptions.remove(index),
            self.columns.remove(index),
        ))
    }

    /// Remove several columns at once. Duplicated indices are ignored.
    pub fn remove_many(&mut self, indices: &[usize]) -> Result<()> {
        for &index in indices {
            self.check_index(index)?;
        }
        let drop: HashSet<usize> = indices.iter().copied().collect();
        let keep: Vec<usize> = (0..self.len()).filter(|i| !drop.contains(i)).collect();
        self.names = keep.iter().map(|&i| self.names[i].clone()).collect();
        self.descriptions = keep.iter().map(|&i| self.descriptions[i].clone()).collect();
        let mut columns = std::mem::take(&mut self.columns);
        let mut kept = Vec::with_capacity(keep.len());
        for (i, column) in columns.drain(..).enumerate() {
            if !drop.contains(&i) {
                kept.push(column);
            }
        }
        self.columns = kept;
        Ok(())
    }

    /// Rename the column at `index`.
    pub fn rename(&mut self, index: usize, name: &str) -> Result<()> {
        self.check_index(index)?;
        if self.index_of(name).is_some_and(|i| i != index) {
            return Err(self.duplicate(name));
        }
        self.names[index] = name.to_string();
        Ok(())
    }

    /// Replace the description of the column at `index`.
    pub fn set_description(&mut self, index: usize, description: &str) -> Result<()> {
        self.check_index(index)?;
        self.descriptions[index] = description.to_string();
        Ok(())
    }

    /// Rebuild every column by picking cells in `order`.
    ///
    /// Callers validate `order` against the column length first.
    pub(crate) fn select(&mut self, order: &[usize]) {
        for column in &mut self.columns {
            *column = order.iter().map(|&i| column[i].clone()).collect();
        }
    }

    /// Append one cell to every column.
    pub(crate) fn append_cell(&mut self, value: T) {
        for column in &mut self.columns {
            column.push(value.clone());
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(MatrixError::IndexOutOfRange {
                family: self.kind,
                index,
                len: self.len(),
            });
        }
        Ok(())
    }

    fn check_len(&self, actual: usize, expected: usize) -> Result<()> {
        if actual != expected {
            return Err(MatrixError::DimensionMismatch {
                family: self.kind,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn duplicate(&self, name: &str) -> MatrixError {
        MatrixError::DuplicateName {
            family: self.kind,
            name: name.to_string(),
        }
    }
}
