//! Cell-level parsing and formatting shared by the loader and writer.

use std::collections::BTreeSet;

/// An unordered set of category labels, one per cell of a categorical column.
pub type Categories = BTreeSet<String>;

/// Separator between sub-values in categorical, text and multi-numeric cells.
pub const SUBVALUE_SEPARATOR: char = ';';

/// Remove one layer of surrounding double quotes.
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Parse a numeric cell. Anything unparseable becomes NaN.
pub fn parse_numeric(s: &str) -> f64 {
    strip_quotes(s).trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Parse an expression cell. Anything unparseable becomes NaN.
pub fn parse_expression(s: &str) -> f32 {
    parse_numeric(s) as f32
}

/// Split a categorical cell into its labels.
pub fn parse_categories(s: &str) -> Categories {
    strip_quotes(s)
        .split(SUBVALUE_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Split a multi-numeric cell. Unparseable tokens become NaN.
pub fn parse_multi_numeric(s: &str) -> Vec<f64> {
    strip_quotes(s)
        .split(SUBVALUE_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().unwrap_or(f64::NAN))
        .collect()
}

/// Normalize whitespace around the sub-tokens of a text cell.
pub fn normalize_text(s: &str) -> String {
    let s = strip_quotes(s);
    if !s.contains(SUBVALUE_SEPARATOR) {
        return s.trim().to_string();
    }
    s.split(SUBVALUE_SEPARATOR)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(";")
}

/// Join category labels into their text form.
pub fn join_categories(categories: &Categories) -> String {
    categories.iter().map(String::as_str).collect::<Vec<_>>().join(";")
}

/// Join multi-numeric values into their text form.
pub fn join_multi_numeric(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Check if a value counts as a valid (finite) measurement.
#[inline]
pub fn is_valid(value: f32) -> bool {
    value.is_finite()
}

/// Build a category set from string slices.
pub fn categories<I, S>(labels: I) -> Categories
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels.into_iter().map(Into::into).collect()
}
