//! Output writers for the Business and Media tables.
//!
//! Tables serialize to XLSX (one sheet, bold header row), CSV or JSON
//! (an array of objects keyed by column name, in column order).

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{OutputError, OutputResult};
use crate::models::{OutputTable, Scalar, TableKind};
use crate::transform::reshape::ReshapeOutput;

/// Serialization format of a downloaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            OutputFormat::Csv => "text/csv; charset=utf-8",
            OutputFormat::Json => "application/json",
        }
    }

    /// File name for one of the two tables, e.g. `ROI_Media.csv`.
    pub fn file_name(&self, kind: TableKind) -> String {
        format!("{}.{}", kind.file_stem(), self.extension())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(OutputFormat::Xlsx),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(OutputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Serialize one table.
pub fn write_table(table: &OutputTable, format: OutputFormat) -> OutputResult<Vec<u8>> {
    match format {
        OutputFormat::Xlsx => write_xlsx(table, "Sheet1"),
        OutputFormat::Csv => write_csv(table),
        OutputFormat::Json => Ok(serde_json::to_vec_pretty(&JsonRows(table))?),
    }
}

/// Write both tables to `dir` as `ROI_Business.<ext>` and `ROI_Media.<ext>`.
pub fn write_outputs(
    output: &ReshapeOutput,
    dir: impl AsRef<Path>,
    format: OutputFormat,
) -> OutputResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    [TableKind::Business, TableKind::Media]
        .into_iter()
        .map(|kind| -> OutputResult<PathBuf> {
            let path = dir.join(format.file_name(kind));
            std::fs::write(&path, write_table(output.table(kind), format)?)?;
            Ok(path)
        })
        .collect()
}

fn write_xlsx(table: &OutputTable, sheet_name: &str) -> OutputResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (c, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, xlsx_col(c)?, name, &header)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let xr = u32::try_from(r + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (c, value) in row.iter().enumerate() {
            let xc = xlsx_col(c)?;
            match value {
                Scalar::Number(n) => {
                    worksheet.write_number(xr, xc, *n)?;
                }
                Scalar::Date(None) => {}
                other => {
                    worksheet.write_string(xr, xc, other.to_text())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn xlsx_col(c: usize) -> Result<u16, XlsxError> {
    u16::try_from(c).map_err(|_| XlsxError::RowColumnLimitError)
}

fn write_csv(table: &OutputTable) -> OutputResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Scalar::to_text))?;
    }
    writer
        .into_inner()
        .map_err(|e| OutputError::Io(e.into_error()))
}

/// Rows as JSON objects, keys in column order.
struct JsonRows<'a>(&'a OutputTable);

struct JsonRow<'a> {
    columns: &'a [String],
    values: &'a [Scalar],
}

impl Serialize for JsonRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.row_count()))?;
        for values in self.0.rows() {
            seq.serialize_element(&JsonRow {
                columns: self.0.columns(),
                values,
            })?;
        }
        seq.end()
    }
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
