//! Tab-separated writers for matrices and grouping templates.

use crate::data::cell::{join_categories, join_multi_numeric, parse_categories};
use crate::data::{AnnotatedMatrix, Categories, Family};
use crate::error::{MatrixError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Grouping name used when none is given.
pub const DEFAULT_GROUPING_NAME: &str = "New grouping";

/// Write a matrix as a tab-separated file that [`TabularLoader`] reads back.
///
/// [`TabularLoader`]: crate::io::TabularLoader
pub fn write_matrix(matrix: &AnnotatedMatrix, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_matrix_to(matrix, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a matrix to any writer.
///
/// Columns are ordered expression, numeric, categorical, text, multi-numeric.
/// A `#!{Type}` row always follows the header; `#!{Description}` is written
/// when any description is set, then one row per category and numeric row.
pub fn write_matrix_to<W: Write>(matrix: &AnnotatedMatrix, writer: &mut W) -> Result<()> {
    let n_expr = matrix.expression_column_count();
    let numeric = matrix.numeric_columns();
    let category = matrix.category_columns();
    let text = matrix.text_columns();
    let multi = matrix.multi_numeric_columns();

    let mut names: Vec<&str> = Vec::new();
    let mut descriptions: Vec<&str> = Vec::new();
    let mut types: Vec<&str> = Vec::new();
    let families: [(Family, &[String], &[String]); 5] = [
        (
            Family::Expression,
            matrix.expression_names(),
            matrix.expression_descriptions(),
        ),
        (Family::Numeric, numeric.names(), numeric.descriptions()),
        (Family::Category, category.names(), category.descriptions()),
        (Family::Text, text.names(), text.descriptions()),
        (Family::MultiNumeric, multi.names(), multi.descriptions()),
    ];
    for (family, family_names, family_descriptions) in families {
        let code = family.type_code().unwrap_or("T");
        names.extend(family_names.iter().map(String::as_str));
        descriptions.extend(family_descriptions.iter().map(String::as_str));
        types.extend(std::iter::repeat(code).take(family_names.len()));
    }
    if names.is_empty() {
        return Ok(());
    }

    writeln!(writer, "{}", names.join("\t"))?;
    writeln!(writer, "#!{{Type}}{}", types.join("\t"))?;
    if descriptions.iter().any(|d| !d.is_empty()) {
        writeln!(writer, "#!{{Description}}{}", descriptions.join("\t"))?;
    }

    let pad = names.len() - n_expr;
    for (name, _, values) in matrix.category_rows().iter() {
        let cells: Vec<String> = values.iter().map(join_categories).collect();
        write_annotation_row(writer, &format!("C:{}", name), &cells, pad)?;
    }
    for (name, _, values) in matrix.numeric_rows().iter() {
        let cells: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        write_annotation_row(writer, &format!("N:{}", name), &cells, pad)?;
    }

    for row in 0..matrix.row_count() {
        let mut cells: Vec<String> = Vec::with_capacity(names.len());
        cells.extend((0..n_expr).map(|j| matrix.expression(row, j).to_string()));
        cells.extend(numeric.iter().map(|(_, _, c)| c[row].to_string()));
        cells.extend(category.iter().map(|(_, _, c)| text_cell(&join_categories(&c[row]))));
        cells.extend(text.iter().map(|(_, _, c)| text_cell(&c[row])));
        cells.extend(multi.iter().map(|(_, _, c)| join_multi_numeric(&c[row])));
        guard_first_field(&mut cells);
        writeln!(writer, "{}", cells.join("\t"))?;
    }
    Ok(())
}

/// First-field prefixes the loader reads as comments or annotation rows.
const PREAMBLE_PREFIXES: &[&str] = &["#", "!", "Type:", "Description:", "Visible:", "C:", "N:"];

fn quoted(cell: &str) -> String {
    format!("\"{}\"", cell)
}

/// Free text as one field. Tabs and line breaks become spaces, and a value
/// already wrapped in quotes gets a second layer the loader strips again.
fn text_cell(value: &str) -> String {
    let cell: String = value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    let trimmed = cell.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        quoted(&cell)
    } else {
        cell
    }
}

/// Quote the first field of a data row that would otherwise be read back as
/// a comment, an annotation or a blank line.
fn guard_first_field(cells: &mut [String]) {
    let blank = cells.iter().all(|c| c.trim().is_empty());
    if let Some(first) = cells.first_mut() {
        let trimmed = first.trim_start();
        if blank || PREAMBLE_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            *first = quoted(first);
        }
    }
}

/// `#!{tag}` followed by the expression-column cells and blank padding.
fn write_annotation_row<W: Write>(
    writer: &mut W,
    tag: &str,
    cells: &[String],
    pad: usize,
) -> Result<()> {
    let mut fields: Vec<&str> = cells.iter().map(String::as_str).collect();
    fields.extend(std::iter::repeat("").take(pad));
    writeln!(writer, "#!{{{}}}{}", tag, fields.join("\t"))?;
    Ok(())
}

/// Write a grouping template for hand editing.
///
/// The header is `Name\t<grouping>` followed by one `column\tcolumn` row per
/// expression column; the second field is the group label to edit.
pub fn write_grouping_template(
    matrix: &AnnotatedMatrix,
    path: &Path,
    grouping_name: Option<&str>,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(
        writer,
        "Name\t{}",
        grouping_name.unwrap_or(DEFAULT_GROUPING_NAME)
    )?;
    for name in matrix.expression_names() {
        writeln!(writer, "{}\t{}", name, name)?;
    }
    writer.flush()?;
    Ok(())
}

/// An edited grouping template: a name and one label set per column name.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingTemplate {
    pub name: String,
    pub assignments: Vec<(String, Categories)>,
}

impl GroupingTemplate {
    /// Labels per expression column of `matrix`, empty for unlisted columns.
    pub fn category_row(&self, matrix: &AnnotatedMatrix) -> Vec<Categories> {
        matrix
            .expression_names()
            .iter()
            .map(|name| {
                self.assignments
                    .iter()
                    .find(|(column, _)| column == name)
                    .map(|(_, labels)| labels.clone())
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Read a grouping template written by [`write_grouping_template`].
pub fn read_grouping_template(path: &Path) -> Result<GroupingTemplate> {
    if !path.exists() {
        return Err(MatrixError::FileNotFound(path.display().to_string()));
    }
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = lines
        .next()
        .ok_or_else(|| MatrixError::EmptyData("Empty grouping template".to_string()))??;
    let name = match header.split_once('\t') {
        Some((key, name)) if key.trim() == "Name" => name.trim().to_string(),
        _ => {
            return Err(MatrixError::InvalidParameter(
                "Grouping template must start with 'Name<TAB><grouping>'".to_string(),
            ))
        }
    };

    let mut assignments = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (column, labels) = line.split_once('\t').unwrap_or((line.as_str(), ""));
        assignments.push((column.trim().to_string(), parse_categories(labels)));
    }
    Ok(GroupingTemplate { name, assignments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::categories;
    use crate::io::{ColumnSelection, TabularLoader};
    use crate::progress::ProcessInfo;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> AnnotatedMatrix {
        let mut matrix = AnnotatedMatrix::new();
        matrix.add_expression_column("S1", "first", vec![1.5, -2.0]).unwrap();
        matrix.add_expression_column("S2", "", vec![0.25, 8.0]).unwrap();
        matrix.add_numeric_column("Score", "", vec![0.5, 100.0]).unwrap();
        matrix
            .add_category_column("Flags", "", vec![categories(["+", "x"]), Categories::new()])
            .unwrap();
        matrix
            .add_text_column("Id", "protein", vec!["P1;P2".into(), "P3".into()])
            .unwrap();
        matrix
            .add_multi_numeric_column("Pos", "", vec![vec![1.0, 2.0], vec![]])
            .unwrap();
        matrix
            .add_category_row("Group", "", vec![categories(["A"]), categories(["B"])])
            .unwrap();
        matrix.add_numeric_row("Dose", "", vec![1.0, 2.5]).unwrap();
        matrix
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let matrix = create_test_matrix();
        let file = NamedTempFile::new().unwrap();
        write_matrix(&matrix, file.path()).unwrap();

        let loader = TabularLoader::default();
        let header = loader.inspect(file.path()).unwrap();
        let selection = header.infer_selection();
        assert_eq!(
            selection,
            ColumnSelection {
                expression: vec![0, 1],
                numeric: vec![2],
                category: vec![3],
                text: vec![4],
                multi_numeric: vec![5],
            }
        );

        let mut loaded = AnnotatedMatrix::new();
        loader
            .load(&mut loaded, file.path(), &selection, &mut ProcessInfo::new())
            .unwrap();
        loaded.set_origin("");
        assert_eq!(loaded, matrix);
    }

    fn write_and_reload(matrix: &AnnotatedMatrix) -> AnnotatedMatrix {
        let file = NamedTempFile::new().unwrap();
        write_matrix(matrix, file.path()).unwrap();
        TabularLoader::default()
            .load_inferred(file.path(), &mut ProcessInfo::new())
            .unwrap()
    }

    #[test]
    fn test_rows_resembling_preamble_survive() {
        let ids = ["#tag", "", "P3", "!x", "C:late", "N:2", "Type:E"];
        let mut matrix = AnnotatedMatrix::new();
        matrix
            .add_text_column("Id", "", ids.iter().map(|s| s.to_string()).collect())
            .unwrap();

        let loaded = write_and_reload(&matrix);
        assert_eq!(loaded.row_count(), ids.len());
        assert_eq!(loaded.text_column_view(0), &ids);
        assert!(loaded.category_rows().is_empty());
        assert!(loaded.numeric_rows().is_empty());
    }

    #[test]
    fn test_blank_rows_survive() {
        let mut matrix = AnnotatedMatrix::new();
        matrix
            .add_category_column("Flags", "", vec![Categories::new(), categories(["#"])])
            .unwrap();
        matrix
            .add_text_column("Id", "", vec![String::new(), "P2".into()])
            .unwrap();

        let loaded = write_and_reload(&matrix);
        assert_eq!(loaded.row_count(), 2);
        assert!(loaded.category_column_view(0)[0].is_empty());
        assert_eq!(loaded.category_column_view(0)[1], categories(["#"]));
        assert_eq!(loaded.text_column_view(0), &["", "P2"]);
    }

    #[test]
    fn test_separators_in_text_stay_in_their_cell() {
        let mut matrix = AnnotatedMatrix::new();
        matrix
            .add_text_column(
                "Note",
                "",
                vec!["a\tb".into(), "line\nbreak".into(), "\"quoted\"".into()],
            )
            .unwrap();
        matrix
            .add_multi_numeric_column("Pos", "", vec![vec![1.0], vec![2.0, 3.0], vec![]])
            .unwrap();

        let loaded = write_and_reload(&matrix);
        assert_eq!(loaded.row_count(), 3);
        assert_eq!(loaded.text_column_view(0), &["a b", "line break", "\"quoted\""]);
        assert_eq!(loaded.multi_numeric_column_view(0)[1], vec![2.0, 3.0]);
        assert!(loaded.multi_numeric_column_view(0)[2].is_empty());
    }

    #[test]
    fn test_grouping_template_round_trip() {
        let mut matrix = AnnotatedMatrix::new();
        matrix.add_expression_column("S1", "", vec![1.0]).unwrap();
        matrix.add_expression_column("S2", "", vec![2.0]).unwrap();
        let file = NamedTempFile::new().unwrap();
        write_grouping_template(&matrix, file.path(), None).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["Name\tNew grouping", "S1\tS1", "S2\tS2"]);

        let template = read_grouping_template(file.path()).unwrap();
        assert_eq!(template.name, DEFAULT_GROUPING_NAME);
        assert_eq!(
            template.category_row(&matrix),
            vec![categories(["S1"]), categories(["S2"])]
        );
    }

    #[test]
    fn test_template_missing_columns_are_unassigned() {
        let mut matrix = AnnotatedMatrix::new();
        matrix.add_expression_column("S1", "", vec![1.0]).unwrap();
        matrix.add_expression_column("S3", "", vec![1.0]).unwrap();
        let template = GroupingTemplate {
            name: "Condition".into(),
            assignments: vec![("S1".into(), categories(["ctrl"]))],
        };
        assert_eq!(
            template.category_row(&matrix),
            vec![categories(["ctrl"]), Categories::new()]
        );
    }

    #[test]
    fn test_bad_template_header() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "Group\tx\n").unwrap();
        assert!(matches!(
            read_grouping_template(file.path()),
            Err(MatrixError::InvalidParameter(_))
        ));
    }
}
