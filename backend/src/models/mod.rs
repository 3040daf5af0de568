//! Domain models for the roisplit reshape pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Cell`] / [`Grid`] - Raw, header-less input as read from a file
//! - [`ColumnRole`] - Business / Media / Excluded classification of a column
//! - [`MediaConvention`] / [`MediaColumn`] - Category and metric derived from a Media column
//! - [`Table`] - Named columns and rows, raw ([`RawTable`]) or normalized ([`OutputTable`])
//! - [`Scalar`] - A normalized output value
//! - [`Warning`] - Recoverable data-quality issues reported next to the output

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Grid
// =============================================================================

/// Row index of the merged group-label row.
pub const GROUP_ROW: usize = 1;

/// Row index of the field-name row.
pub const FIELD_ROW: usize = 3;

/// Row index of the first data row.
pub const DATA_START_ROW: usize = 4;

/// Minimum number of rows a grid needs to have the header layout.
pub const MIN_ROWS: usize = DATA_START_ROW + 1;

/// Minimum number of columns: the date column plus one data column.
pub const MIN_COLUMNS: usize = 2;

/// A raw input cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Blank cells and whitespace-only text count as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as trimmed text, the way a header cell is read.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string().to_uppercase(),
            Cell::DateTime(dt) => {
                if dt.time().num_seconds_from_midnight() == 0 {
                    dt.date().format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// Integers print without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A rectangular view over the raw rows of one sheet.
///
/// The width is the length of the group-label row; shorter rows read as
/// blank-padded and cells beyond the width are ignored.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from string literals; empty strings become blank cells.
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(|s| Cell::from(s.as_ref())).collect())
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column count, taken from the group-label row.
    pub fn width(&self) -> usize {
        self.rows.get(GROUP_ROW).map(Vec::len).unwrap_or(0)
    }

    /// Cell at (row, col), blank when out of bounds.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }
}

// =============================================================================
// Column classification
// =============================================================================

/// Role of a source column in the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    /// Column 0, the date key of both tables.
    Date,
    Business,
    Media,
    Excluded,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnRole::Date => "Date",
            ColumnRole::Business => "Business",
            ColumnRole::Media => "Media",
            ColumnRole::Excluded => "Excluded",
        };
        f.write_str(s)
    }
}

/// Naming convention of a Media column's field name.
///
/// Ordinary media columns are `<platform>_<breakdown>_<metric>`; columns under
/// an owned/shared/earned media group are `<channel>_<metric>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaConvention {
    Ordinary,
    Special,
}

/// Category and metric derived from one Media column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaColumn {
    /// Source column index.
    pub index: usize,
    pub category: String,
    /// Canonical metric name after the rename table.
    pub metric: String,
    pub convention: MediaConvention,
}

/// Everything the pipeline learned about one source column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub index: usize,
    pub group_label: String,
    pub field_name: String,
    pub role: ColumnRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaColumn>,
}

// =============================================================================
// Tables
// =============================================================================

/// Which of the two outputs a table or warning belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Business,
    Media,
}

impl TableKind {
    /// Download file stem, e.g. `ROI_Business`.
    pub fn file_stem(&self) -> &'static str {
        match self {
            TableKind::Business => "ROI_Business",
            TableKind::Media => "ROI_Media",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Business => f.write_str("Business"),
            TableKind::Media => f.write_str("Media"),
        }
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "business" => Ok(TableKind::Business),
            "media" => Ok(TableKind::Media),
            other => Err(format!("unknown table '{}'", other)),
        }
    }
}

/// Ordered, uniquely named columns and rows aligned with them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table<T> {
    columns: Vec<String>,
    rows: Vec<Vec<T>>,
}

/// A table as assembled from source cells, before type normalization.
pub type RawTable = Table<Cell>;

/// A fully normalized output table.
pub type OutputTable = Table<Scalar>;

impl<T> Table<T> {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; it must have one value per column.
    pub fn push_row(&mut self, row: Vec<T>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<T>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<T>> {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at `row` in the column called `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&T> {
        let col = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// All values of the column called `name`, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &T> + '_> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[col]))
    }

    /// Keep only the rows for which `keep` returns true.
    pub fn retain_rows(&mut self, keep: impl FnMut(&Vec<T>) -> bool) {
        self.rows.retain(keep);
    }
}

impl<T: Clone> Table<T> {
    /// The first `n` rows, for display.
    pub fn preview(&self, n: usize) -> Table<T> {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// A normalized output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `None` for a missing or unparseable date.
    Date(Option<NaiveDate>),
    Text(String),
    /// Always finite.
    Number(f64),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Scalar::Date(d) => *d,
            _ => None,
        }
    }

    /// Text rendering used by CSV output and previews.
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Date(Some(d)) => d.format("%Y-%m-%d").to_string(),
            Scalar::Date(None) => String::new(),
            Scalar::Text(s) => s.clone(),
            Scalar::Number(n) => n.to_string(),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Number(n) => serializer.serialize_f64(*n),
            other => serializer.serialize_str(&other.to_text()),
        }
    }
}

// =============================================================================
// Warnings
// =============================================================================

/// A recoverable data-quality issue. The pipeline always completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// Date cell could not be parsed; a blank date was substituted.
    #[serde(rename_all = "camelCase")]
    UnparseableDate {
        table: TableKind,
        row: usize,
        raw: String,
    },

    /// Numeric cell could not be parsed; `0.0` was substituted.
    #[serde(rename_all = "camelCase")]
    UnparseableNumber {
        table: TableKind,
        row: usize,
        column: String,
        raw: String,
    },

    /// A table has no classified columns besides the date.
    #[serde(rename_all = "camelCase")]
    NoMatchingColumns { table: TableKind },

    /// A classified column has a blank field name and was written as `Unnamed_<column>`.
    #[serde(rename_all = "camelCase")]
    BlankFieldName { column: usize, role: ColumnRole },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnparseableDate { table, row, raw } => {
                write!(f, "{} row {}: unparseable date '{}' left blank", table, row, raw)
            }
            Warning::UnparseableNumber {
                table,
                row,
                column,
                raw,
            } => write!(
                f,
                "{} row {}, column '{}': non-numeric value '{}' set to 0",
                table, row, column, raw
            ),
            Warning::NoMatchingColumns { table } => {
                write!(f, "{} table has no matching columns", table)
            }
            Warning::BlankFieldName { column, role } => {
                write!(
                    f,
                    "{} column {} has no field name, written as Unnamed_{}",
                    role, column, column
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pads_short_rows() {
        let grid = Grid::from_strings(vec![
            vec!["x"],
            vec!["", "KPI", "MEDIA"],
            vec![],
        ]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(0, 2), &Cell::Empty);
        assert_eq!(grid.cell(2, 0), &Cell::Empty);
        assert_eq!(grid.cell(42, 0), &Cell::Empty);
    }

    #[test]
    fn test_cell_to_text() {
        assert_eq!(Cell::Number(3.0).to_text(), "3");
        assert_eq!(Cell::Number(2.5).to_text(), "2.5");
        assert_eq!(Cell::Text("  fb_imp ".into()).to_text(), "fb_imp");
        assert_eq!(Cell::Bool(true).to_text(), "TRUE");
        let dt = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Cell::DateTime(dt).to_text(), "2024-01-05");
    }

    #[test]
    fn test_blank_cells() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::Text("   ".into()).is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn test_table_lookup_and_preview() {
        let mut table: Table<Scalar> = Table::new(vec!["Date".into(), "Spend".into()]);
        for i in 0..15 {
            table.push_row(vec![Scalar::Date(None), Scalar::Number(i as f64)]);
        }
        assert_eq!(table.get(3, "Spend"), Some(&Scalar::Number(3.0)));
        assert_eq!(table.get(3, "Clicks"), None);
        assert_eq!(table.column("Spend").unwrap().count(), 15);

        let preview = table.preview(10);
        assert_eq!(preview.row_count(), 10);
        assert_eq!(preview.columns(), table.columns());
    }

    #[test]
    fn test_scalar_serialization() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let row = vec![
            Scalar::Date(Some(date)),
            Scalar::Date(None),
            Scalar::Text("FB".into()),
            Scalar::Number(1.5),
        ];
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!(["2024-03-01", "", "FB", 1.5]));
    }

    #[test]
    fn test_table_kind_parse() {
        assert_eq!("Media".parse::<TableKind>(), Ok(TableKind::Media));
        assert_eq!("business".parse::<TableKind>(), Ok(TableKind::Business));
        assert!("kpi".parse::<TableKind>().is_err());
        assert_eq!(TableKind::Business.file_stem(), "ROI_Business");
    }

    #[test]
    fn test_warning_serialization() {
        let w = Warning::NoMatchingColumns {
            table: TableKind::Media,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "noMatchingColumns");
        assert_eq!(json["table"], "media");
    }
}
