//! Grid loader: reads a CSV or spreadsheet export into a header-less [`Grid`].
//!
//! Delimited text gets encoding and delimiter auto-detection; spreadsheets are
//! read from their first worksheet. No header row is assumed: the reshape
//! engine addresses the header rows by absolute position.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::models::{Cell, Grid};

/// Number of leading lines inspected when guessing the delimiter.
const DELIMITER_SAMPLE_LINES: usize = 5;

/// Kind of file a grid was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// CSV / TSV / plain delimited text
    Delimited,
    /// XLSX, XLS, XLSB or ODS workbook
    Spreadsheet,
}

impl SourceFormat {
    /// Pick the reader from the file extension.
    pub fn from_file_name(name: &str) -> LoadResult<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(SourceFormat::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceFormat::Spreadsheet),
            "" => Err(LoadError::UnsupportedFormat(format!("'{}' has no extension", name))),
            other => Err(LoadError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Metadata about where a grid came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub format: SourceFormat,
    /// Detected encoding (delimited text only)
    pub encoding: Option<String>,
    /// Detected delimiter (delimited text only)
    pub delimiter: Option<char>,
    /// Worksheet read (spreadsheets only)
    pub sheet: Option<String>,
    pub row_count: usize,
    pub column_count: usize,
}

/// A loaded grid and its source metadata.
#[derive(Debug, Clone)]
pub struct LoadedGrid {
    pub grid: Grid,
    pub source: SourceInfo,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> LoadResult<String> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "iso-8859-1" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.into_owned())
        }
        label => {
            let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
                .ok_or_else(|| LoadError::Encoding(format!("unknown encoding '{}'", label)))?;
            let (text, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                // chardet guessed wrong; UTF-8 is the safest reading
                Ok(String::from_utf8_lossy(bytes).into_owned())
            } else {
                Ok(text.into_owned())
            }
        }
    }
}

/// Detect the delimiter by counting occurrences in the first lines.
///
/// Report exports often start with a sparse title row, so several lines
/// are sampled instead of only the first.
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count: usize = sample.iter().map(|line| line.matches(sep).count()).sum();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text into a grid. Rows may have different lengths.
pub fn parse_delimited(content: &str, delimiter: char) -> LoadResult<Grid> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| LoadError::Encoding(format!("non-ASCII delimiter '{}'", delimiter)))?;

    let content = keep_blank_lines(content, char::from(delimiter));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from).collect());
    }

    Ok(Grid::new(rows))
}

/// The csv reader skips empty lines, which would shift the fixed header rows.
/// Interior empty lines get a lone delimiter so they read as blank rows;
/// trailing ones are dropped.
fn keep_blank_lines(content: &str, delimiter: char) -> String {
    let content = content.trim_end_matches(['\r', '\n']);
    let mut out = String::with_capacity(content.len() + 16);
    let mut in_quotes = false;
    let mut at_line_start = true;

    for ch in content.chars() {
        if ch == '\n' && at_line_start && !in_quotes {
            out.push(delimiter);
        }
        if ch == '"' {
            in_quotes = !in_quotes;
        }
        at_line_start = ch == '\n' || (at_line_start && ch == '\r');
        out.push(ch);
    }

    out
}

/// Parse delimited bytes with auto-detection of encoding and delimiter.
pub fn parse_delimited_bytes(bytes: &[u8]) -> LoadResult<LoadedGrid> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let grid = parse_delimited(&content, delimiter)?;

    let source = SourceInfo {
        format: SourceFormat::Delimited,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
        sheet: None,
        row_count: grid.row_count(),
        column_count: grid.width(),
    };
    Ok(LoadedGrid { grid, source })
}

/// Read the first worksheet of a workbook into a grid.
///
/// calamine trims the used range to its first non-empty cell; the offset is
/// re-applied so that row and column indices stay absolute.
pub fn parse_spreadsheet_bytes(bytes: &[u8]) -> LoadResult<LoadedGrid> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    let sheet = workbook.sheet_names().first().cloned();
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }

    let grid = Grid::new(rows);
    let source = SourceInfo {
        format: SourceFormat::Spreadsheet,
        encoding: None,
        delimiter: None,
        sheet,
        row_count: grid.row_count(),
        column_count: grid.width(),
    };
    Ok(LoadedGrid { grid, source })
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        // as_datetime honours the workbook's 1900/1904 date system
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        // formula errors (#DIV/0!, #N/A) carry no value
        Data::Error(_) => Cell::Empty,
    }
}

/// Load a grid from raw bytes, choosing the reader from `file_name`.
pub fn load_grid_bytes(bytes: &[u8], file_name: &str) -> LoadResult<LoadedGrid> {
    if bytes.is_empty() {
        return Err(LoadError::Empty);
    }

    match SourceFormat::from_file_name(file_name)? {
        SourceFormat::Delimited => parse_delimited_bytes(bytes),
        SourceFormat::Spreadsheet => parse_spreadsheet_bytes(bytes),
    }
}

/// Load a grid from a file on disk.
pub fn load_grid_file<P: AsRef<Path>>(path: P) -> LoadResult<LoadedGrid> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    load_grid_bytes(&bytes, name)
}
