//! Delimited text loader producing an [`AnnotatedMatrix`].
//!
//! The format is a header line followed by optional annotation rows and then
//! data rows. Annotation rows are only recognized between the header and the
//! first data row:
//!
//! ```text
//! Intensity A	Intensity B	Protein IDs
//! #!{Type}E	E	T
//! #!{Description}first	second
//! #!{C:Group}A	B
//! 1.5	2.0	P12345;P67890
//! ```
//!
//! The plain forms `Type:E`, `Description:…`, `Visible:…`, `C:Group` and
//! `N:Dose` in the first field are accepted as well. `Type:` rows must hold
//! only type codes and `N:` rows only numbers, otherwise the line is data.
//! A first data row whose first field starts with `C:`, `Description:` or
//! `Visible:` is still read as an annotation; quote the field to keep it as
//! data, as [`write_matrix`](crate::io::write_matrix) does.

use crate::data::cell::{
    normalize_text, parse_categories, parse_expression, parse_multi_numeric, parse_numeric,
    strip_quotes,
};
use crate::data::{AnnotatedMatrix, Categories, Family, FamilyParts, MatrixParts};
use crate::error::{MatrixError, Result};
use crate::progress::ProcessInfo;
use csv::{ByteRecord, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Rows sampled by [`TabularLoader::inspect`].
const INSPECT_ROWS: usize = 100;

/// Data rows between progress reports.
const PROGRESS_INTERVAL: usize = 1000;

/// Cell texts treated as blank when guessing column types.
const MISSING_TOKENS: &[&str] = &["", "NaN", "NA", "n/a", "N/A", "#N/A", "#n/a", "nan"];

/// Lexical options of the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Field separator. Derived from the file extension when `None`.
    pub separator: Option<char>,
    /// Lines starting with one of these are skipped.
    pub comment_prefixes: Vec<String>,
    /// Lines starting with one of these are never comments.
    pub comment_exceptions: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            separator: None,
            comment_prefixes: vec!["#".to_string(), "!".to_string()],
            comment_exceptions: vec!["#N/A".to_string(), "#n/a".to_string()],
        }
    }
}

/// Assignment of file columns to families, by header position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSelection {
    pub expression: Vec<usize>,
    pub numeric: Vec<usize>,
    pub category: Vec<usize>,
    pub text: Vec<usize>,
    pub multi_numeric: Vec<usize>,
}

impl ColumnSelection {
    /// Build a selection from one family per header column.
    pub fn from_types(types: &[Family]) -> Self {
        let mut selection = Self::default();
        for (i, family) in types.iter().enumerate() {
            match family {
                Family::Expression => selection.expression.push(i),
                Family::Numeric => selection.numeric.push(i),
                Family::Category => selection.category.push(i),
                Family::Text => selection.text.push(i),
                Family::MultiNumeric => selection.multi_numeric.push(i),
                Family::CategoryRow | Family::NumericRow => {}
            }
        }
        selection
    }

    fn groups(&self) -> [&[usize]; 5] {
        [
            &self.expression,
            &self.numeric,
            &self.category,
            &self.text,
            &self.multi_numeric,
        ]
    }

    /// Check the selection against a header.
    ///
    /// Fails when an index is selected twice, points past the header, or two
    /// selected columns carry the same name.
    pub fn validate(&self, header: &[String]) -> Result<()> {
        let mut indices = HashSet::new();
        let mut names = HashSet::new();
        for &i in self.groups().iter().flat_map(|g| g.iter()) {
            if !indices.insert(i) {
                return Err(MatrixError::AmbiguousSelection(i));
            }
            let name = header.get(i).ok_or_else(|| {
                MatrixError::InvalidParameter(format!(
                    "Column {} selected but the header has {} columns",
                    i,
                    header.len()
                ))
            })?;
            if !names.insert(name.as_str()) {
                return Err(MatrixError::DuplicateColumnName(name.clone()));
            }
        }
        Ok(())
    }

    /// Total number of selected columns.
    pub fn len(&self) -> usize {
        self.groups().iter().map(|g| g.len()).sum()
    }

    /// Check if no column is selected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Header, annotation rows and a sample of data rows of a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileHeader {
    pub column_names: Vec<String>,
    /// Per-column descriptions, empty strings when the file has none.
    pub descriptions: Vec<String>,
    /// Families from the `Type` row, if present.
    pub types: Option<Vec<Family>>,
    /// Leading data rows, at most a hundred.
    pub first_rows: Vec<Vec<String>>,
}

impl FileHeader {
    /// Guess a column selection.
    ///
    /// Uses the `Type` row when the file has one. Otherwise columns whose
    /// sampled values all parse as numbers (or are blank) become expression
    /// columns and everything else text.
    pub fn infer_selection(&self) -> ColumnSelection {
        if let Some(types) = &self.types {
            return ColumnSelection::from_types(types);
        }
        let types: Vec<Family> = (0..self.column_names.len())
            .map(|i| {
                let mut any_number = false;
                let all_numeric = self.first_rows.iter().all(|row| {
                    let cell = strip_quotes(row.get(i).map(String::as_str).unwrap_or(""));
                    if MISSING_TOKENS.contains(&cell) {
                        return true;
                    }
                    let ok = cell.parse::<f64>().is_ok();
                    any_number |= ok;
                    ok
                });
                if all_numeric && any_number {
                    Family::Expression
                } else {
                    Family::Text
                }
            })
            .collect();
        ColumnSelection::from_types(&types)
    }
}

/// Metadata row found between the header and the data.
#[derive(Debug, Clone, PartialEq)]
enum Annotation {
    Type(Vec<String>),
    Description(Vec<String>),
    Visible(Vec<String>),
    CategoryRow(String, Vec<String>),
    NumericRow(String, Vec<String>),
}

#[derive(Debug, PartialEq)]
enum Line {
    Skip,
    Header,
    Annotation(Annotation),
    Data,
}

/// Classifies records as header, annotation, comment or data.
struct LineClassifier<'a> {
    options: &'a LoadOptions,
    header_seen: bool,
    data_seen: bool,
}

impl<'a> LineClassifier<'a> {
    fn new(options: &'a LoadOptions) -> Self {
        Self {
            options,
            header_seen: false,
            data_seen: false,
        }
    }

    fn classify(&mut self, record: &StringRecord) -> Line {
        let first = record.get(0).unwrap_or("");
        if record.iter().all(|f| f.trim().is_empty()) {
            return Line::Skip;
        }
        if self.header_seen && !self.data_seen {
            if let Some(annotation) = parse_annotation(record) {
                return Line::Annotation(annotation);
            }
        }
        if self.is_comment(first) {
            return Line::Skip;
        }
        if !self.header_seen {
            self.header_seen = true;
            Line::Header
        } else {
            self.data_seen = true;
            Line::Data
        }
    }

    fn is_comment(&self, first: &str) -> bool {
        if self
            .options
            .comment_exceptions
            .iter()
            .any(|e| first.starts_with(e.as_str()))
        {
            return false;
        }
        self.options
            .comment_prefixes
            .iter()
            .any(|p| !p.is_empty() && first.starts_with(p.as_str()))
    }
}

/// Fields of an annotation row with the first field replaced by `rest`.
fn annotation_fields(record: &StringRecord, rest: &str) -> Vec<String> {
    let mut fields: Vec<String> = record.iter().map(String::from).collect();
    if let Some(first) = fields.first_mut() {
        *first = rest.to_string();
    }
    fields
}

fn parse_annotation(record: &StringRecord) -> Option<Annotation> {
    let first = record.get(0)?;
    if let Some(tagged) = first.strip_prefix("#!{") {
        let (tag, rest) = tagged.split_once('}')?;
        let fields = annotation_fields(record, rest);
        return match tag {
            "Type" => Some(Annotation::Type(fields)),
            "Description" => Some(Annotation::Description(fields)),
            "Visible" => Some(Annotation::Visible(fields)),
            _ => {
                if let Some(name) = tag.strip_prefix("C:") {
                    Some(Annotation::CategoryRow(name.trim().to_string(), fields))
                } else {
                    tag.strip_prefix("N:")
                        .map(|name| Annotation::NumericRow(name.trim().to_string(), fields))
                }
            }
        };
    }
    if let Some(rest) = first.strip_prefix("Type:") {
        let fields = annotation_fields(record, rest);
        let all_codes = fields.iter().all(|f| {
            let code = strip_quotes(f);
            code.is_empty() || Family::from_type_code(code).is_some()
        });
        return all_codes.then_some(Annotation::Type(fields));
    }
    if let Some(rest) = first.strip_prefix("Description:") {
        return Some(Annotation::Description(annotation_fields(record, rest)));
    }
    if let Some(rest) = first.strip_prefix("Visible:") {
        return Some(Annotation::Visible(annotation_fields(record, rest)));
    }
    if let Some(name) = first.strip_prefix("C:") {
        return Some(Annotation::CategoryRow(name.trim().to_string(), annotation_fields(record, "")));
    }
    if let Some(name) = first.strip_prefix("N:") {
        let fields = annotation_fields(record, "");
        let all_numbers = fields.iter().all(|f| {
            let cell = strip_quotes(f);
            MISSING_TOKENS.contains(&cell) || cell.parse::<f64>().is_ok()
        });
        return all_numbers.then(|| Annotation::NumericRow(name.trim().to_string(), fields));
    }
    None
}

/// Header and annotation rows collected while scanning.
#[derive(Debug, Default)]
struct Preamble {
    names: Vec<String>,
    types: Option<Vec<String>>,
    descriptions: Option<Vec<String>>,
    category_rows: Vec<(String, Vec<String>)>,
    numeric_rows: Vec<(String, Vec<String>)>,
}

impl Preamble {
    fn add(&mut self, annotation: Annotation) {
        match annotation {
            Annotation::Type(fields) => self.types = Some(fields),
            Annotation::Description(fields) => self.descriptions = Some(fields),
            Annotation::Visible(_) => log::debug!("Ignoring Visible annotation row"),
            Annotation::CategoryRow(name, fields) => self.category_rows.push((name, fields)),
            Annotation::NumericRow(name, fields) => self.numeric_rows.push((name, fields)),
        }
    }

    fn description(&self, i: usize) -> String {
        self.descriptions
            .as_ref()
            .and_then(|d| d.get(i))
            .map(|s| strip_quotes(s).to_string())
            .unwrap_or_default()
    }

    fn types(&self) -> Option<Vec<Family>> {
        self.types.as_ref().map(|codes| {
            (0..self.names.len())
                .map(|i| {
                    codes
                        .get(i)
                        .and_then(|c| Family::from_type_code(strip_quotes(c)))
                        .unwrap_or(Family::Text)
                })
                .collect()
        })
    }
}

/// Column buffers filled row by row.
#[derive(Default)]
struct ColumnBuffers {
    expression: Vec<Vec<f32>>,
    numeric: Vec<Vec<f64>>,
    category: Vec<Vec<Categories>>,
    text: Vec<Vec<String>>,
    multi_numeric: Vec<Vec<Vec<f64>>>,
    rows: usize,
}

impl ColumnBuffers {
    fn new(selection: &ColumnSelection) -> Self {
        Self {
            expression: vec![Vec::new(); selection.expression.len()],
            numeric: vec![Vec::new(); selection.numeric.len()],
            category: vec![Vec::new(); selection.category.len()],
            text: vec![Vec::new(); selection.text.len()],
            multi_numeric: vec![Vec::new(); selection.multi_numeric.len()],
            rows: 0,
        }
    }

    fn push_row(&mut self, record: &StringRecord, selection: &ColumnSelection) {
        let cell = |i: usize| record.get(i).unwrap_or("");
        for (column, &i) in self.expression.iter_mut().zip(&selection.expression) {
            column.push(parse_expression(cell(i)));
        }
        for (column, &i) in self.numeric.iter_mut().zip(&selection.numeric) {
            column.push(parse_numeric(cell(i)));
        }
        for (column, &i) in self.category.iter_mut().zip(&selection.category) {
            column.push(parse_categories(cell(i)));
        }
        for (column, &i) in self.text.iter_mut().zip(&selection.text) {
            column.push(normalize_text(cell(i)));
        }
        for (column, &i) in self.multi_numeric.iter_mut().zip(&selection.multi_numeric) {
            column.push(parse_multi_numeric(cell(i)));
        }
        self.rows += 1;
    }

    fn into_parts(self, preamble: &Preamble, selection: &ColumnSelection) -> MatrixParts {
        fn family<T>(columns: Vec<Vec<T>>, indices: &[usize], preamble: &Preamble) -> FamilyParts<T> {
            let mut parts = FamilyParts::default();
            for (values, &i) in columns.into_iter().zip(indices) {
                parts.push(preamble.names[i].clone(), preamble.description(i), values);
            }
            parts
        }

        let at_expression = |fields: &[String]| -> Vec<String> {
            selection
                .expression
                .iter()
                .map(|&i| fields.get(i).cloned().unwrap_or_default())
                .collect()
        };
        let mut category_rows = FamilyParts::default();
        for (name, fields) in &preamble.category_rows {
            let values = at_expression(fields).iter().map(|s| parse_categories(s)).collect();
            category_rows.push(name.clone(), "", values);
        }
        let mut numeric_rows = FamilyParts::default();
        for (name, fields) in &preamble.numeric_rows {
            let values = at_expression(fields).iter().map(|s| parse_numeric(s)).collect();
            numeric_rows.push(name.clone(), "", values);
        }

        MatrixParts {
            row_count: self.rows,
            expression: family(self.expression, &selection.expression, preamble),
            quality: None,
            imputed: None,
            numeric: family(self.numeric, &selection.numeric, preamble),
            category: family(self.category, &selection.category, preamble),
            text: family(self.text, &selection.text, preamble),
            multi_numeric: family(self.multi_numeric, &selection.multi_numeric, preamble),
            category_rows,
            numeric_rows,
        }
    }
}

/// Loads delimited text files into annotated matrices.
#[derive(Debug, Clone, Default)]
pub struct TabularLoader {
    options: LoadOptions,
}

impl TabularLoader {
    /// Create a loader with the given options.
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Options this loader was built with.
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Separator for `path`: the configured one, else comma for `.csv`
    /// files and tab for everything else.
    pub fn separator_for(&self, path: &Path) -> Result<u8> {
        let separator = self.options.separator.unwrap_or_else(|| {
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if is_csv {
                ','
            } else {
                '\t'
            }
        });
        if !separator.is_ascii() {
            return Err(MatrixError::InvalidParameter(format!(
                "Separator '{}' is not an ASCII character",
                separator
            )));
        }
        Ok(separator as u8)
    }

    fn reader<R: Read>(&self, source: R, separator: u8) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .delimiter(separator)
            .has_headers(false)
            .flexible(true)
            .quoting(separator == b',')
            .from_reader(source)
    }

    fn open(&self, path: &Path) -> Result<File> {
        if !path.exists() {
            return Err(MatrixError::FileNotFound(path.display().to_string()));
        }
        Ok(File::open(path)?)
    }

    /// Read the header, annotation rows and the first data rows of a file.
    pub fn inspect(&self, path: &Path) -> Result<FileHeader> {
        let file = self.open(path)?;
        let separator = self.separator_for(path)?;
        let mut reader = self.reader(BufReader::new(file), separator);
        let mut classifier = LineClassifier::new(&self.options);
        let mut preamble = Preamble::default();
        let mut first_rows = Vec::new();

        for record in reader.byte_records() {
            let record = StringRecord::from_byte_record_lossy(record?);
            match classifier.classify(&record) {
                Line::Skip => {}
                Line::Header => preamble.names = header_names(&record),
                Line::Annotation(a) => preamble.add(a),
                Line::Data => {
                    first_rows.push(record.iter().map(String::from).collect());
                    if first_rows.len() >= INSPECT_ROWS {
                        break;
                    }
                }
            }
        }
        if !classifier.header_seen {
            return Err(MatrixError::EmptyData(format!(
                "{} has no header line",
                path.display()
            )));
        }
        let descriptions = (0..preamble.names.len())
            .map(|i| preamble.description(i))
            .collect();
        Ok(FileHeader {
            types: preamble.types(),
            column_names: preamble.names,
            descriptions,
            first_rows,
        })
    }

    /// Load a file into `matrix`.
    ///
    /// # Arguments
    /// * `matrix` - Target; replaced wholesale on success, untouched on error
    /// * `path` - File to read
    /// * `selection` - Columns to load per family
    /// * `info` - Status and progress callbacks
    pub fn load(
        &self,
        matrix: &mut AnnotatedMatrix,
        path: &Path,
        selection: &ColumnSelection,
        info: &mut ProcessInfo,
    ) -> Result<()> {
        let file = self.open(path)?;
        let total = file.metadata().ok().map(|m| m.len());
        let separator = self.separator_for(path)?;
        info.status(&format!("Reading {}", path.display()));
        self.load_from(matrix, BufReader::new(file), separator, selection, total, info)?;
        matrix.set_origin(&path.display().to_string());
        info.status("Done");
        Ok(())
    }

    /// Load a file, choosing columns with [`FileHeader::infer_selection`].
    pub fn load_inferred(&self, path: &Path, info: &mut ProcessInfo) -> Result<AnnotatedMatrix> {
        let selection = self.inspect(path)?.infer_selection();
        log::debug!(
            "Inferred {} expression and {} other columns",
            selection.expression.len(),
            selection.len() - selection.expression.len()
        );
        let mut matrix = AnnotatedMatrix::new();
        self.load(&mut matrix, path, &selection, info)?;
        Ok(matrix)
    }

    /// Load from any reader. The separator must be configured or defaults to tab.
    pub fn load_reader<R: Read>(
        &self,
        matrix: &mut AnnotatedMatrix,
        source: R,
        selection: &ColumnSelection,
        info: &mut ProcessInfo,
    ) -> Result<()> {
        let separator = self.separator_for(Path::new(""))?;
        self.load_from(matrix, source, separator, selection, None, info)
    }

    fn load_from<R: Read>(
        &self,
        matrix: &mut AnnotatedMatrix,
        source: R,
        separator: u8,
        selection: &ColumnSelection,
        total_bytes: Option<u64>,
        info: &mut ProcessInfo,
    ) -> Result<()> {
        let mut reader = self.reader(source, separator);
        let mut classifier = LineClassifier::new(&self.options);
        let mut preamble = Preamble::default();
        let mut buffers = ColumnBuffers::new(selection);
        let mut raw = ByteRecord::new();

        while reader.read_byte_record(&mut raw)? {
            // Invalid UTF-8 becomes U+FFFD.
            let record = StringRecord::from_byte_record_lossy(raw.clone());
            match classifier.classify(&record) {
                Line::Skip => {}
                Line::Header => {
                    preamble.names = header_names(&record);
                    selection.validate(&preamble.names)?;
                }
                Line::Annotation(a) => preamble.add(a),
                Line::Data => {
                    buffers.push_row(&record, selection);
                    if buffers.rows % PROGRESS_INTERVAL == 0 {
                        if let Some(total) = total_bytes.filter(|&t| t > 0) {
                            let read = reader.position().byte();
                            info.progress((read * 100 / total) as usize);
                        }
                    }
                }
            }
        }
        if !classifier.header_seen {
            return Err(MatrixError::EmptyData("No header line found".to_string()));
        }
        info.progress(100);

        let rows = buffers.rows;
        let parts = buffers.into_parts(&preamble, selection);
        matrix.set_data(parts)?;
        log::info!(
            "Loaded {} rows, {} expression columns",
            rows,
            matrix.expression_column_count()
        );
        Ok(())
    }
}

fn header_names(record: &StringRecord) -> Vec<String> {
    record
        .iter()
        .map(|f| strip_quotes(f).to_string())
        .collect()
}
