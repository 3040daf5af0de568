//! Type normalization of assembled tables.
//!
//! - `Date` becomes an ISO `YYYY-MM-DD` date, or blank when it can't be read
//! - the Media table's `Media` and `Product` columns stay text
//! - every other column becomes a finite `f64`, `0.0` when missing or invalid
//!
//! Unreadable cells never fail the pipeline; they are reported as warnings.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::{ReshapeConfig, UndatedRows};
use crate::models::{Cell, OutputTable, RawTable, Scalar, TableKind, Warning};

/// Largest spreadsheet serial day number (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Date-time layouts tried after the configured date formats.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Whitespace and currency marks around a number.
static NUMBER_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"NT\$|[\s$€£¥]").expect("number noise pattern is valid"));

/// Comma thousands grouping: `1,234` or `-12,345,678.9`.
static THOUSANDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("thousands pattern is valid")
});

/// A non-blank cell that does not hold a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not a finite number")]
pub struct InvalidNumber;

/// Convert a spreadsheet serial day number (1900 date system) to a date-time.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL + 1.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Read a date from a cell. `None` for blank or unreadable cells.
pub fn parse_date(cell: &Cell, formats: &[String]) -> Option<NaiveDate> {
    match cell {
        Cell::Empty | Cell::Bool(_) => None,
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Number(n) => date_from_number(*n),
        Cell::Text(s) => parse_date_text(s.trim(), formats),
    }
}

/// `20240131` reads as a compact date, anything else as a serial day number.
fn date_from_number(n: f64) -> Option<NaiveDate> {
    if n.fract() == 0.0 && (19_000_101.0..=29_991_231.0).contains(&n) {
        let n = n as i64;
        let (y, m, d) = (n / 10_000, (n / 100) % 100, n % 100);
        if let Some(date) = NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32) {
            return Some(date);
        }
    }
    if n < 1.0 {
        return None;
    }
    excel_serial_to_datetime(n).map(|dt| dt.date())
}

fn parse_date_text(s: &str, formats: &[String]) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    for fmt in formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    s.parse::<f64>().ok().and_then(date_from_number)
}

/// Read a number from a cell.
///
/// `Ok(None)` means the cell is blank.
pub fn parse_number(cell: &Cell) -> Result<Option<f64>, InvalidNumber> {
    let value = match cell {
        Cell::Empty => return Ok(None),
        Cell::Number(n) => *n,
        Cell::Bool(b) => f64::from(u8::from(*b)),
        Cell::DateTime(_) => return Err(InvalidNumber),
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            parse_number_text(s).ok_or(InvalidNumber)?
        }
    };

    if value.is_finite() {
        Ok(Some(value))
    } else {
        Err(InvalidNumber)
    }
}

/// Accepts `1,234.5`, `$ 120`, `NT$300` and accounting negatives `(42)`.
///
/// A comma is only read as a thousands separator; decimal commas such as
/// `12,5` are rejected.
fn parse_number_text(s: &str) -> Option<f64> {
    let (negative, body) = match s.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned = NUMBER_NOISE.replace_all(body, "");
    let value: f64 = if !cleaned.contains(',') {
        cleaned.parse().ok()?
    } else if THOUSANDS.is_match(&cleaned) {
        cleaned.replace(',', "").parse().ok()?
    } else {
        return None;
    };
    Some(if negative { -value } else { value })
}

/// How the cells of one output column are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Date,
    Text,
    Number,
}

/// Column 0 is the date in both tables; only the Media table's fixed
/// `Media` and `Product` columns stay text.
fn value_type(kind: TableKind, column: usize) -> ValueType {
    match (kind, column) {
        (_, 0) => ValueType::Date,
        (TableKind::Media, 1 | 2) => ValueType::Text,
        _ => ValueType::Number,
    }
}

/// Normalize every cell of a raw table.
///
/// Rows keep their position; with [`UndatedRows::Drop`] rows without a
/// readable date are removed afterwards.
pub fn normalize_table(
    raw: RawTable,
    kind: TableKind,
    config: &ReshapeConfig,
) -> (OutputTable, Vec<Warning>) {
    let columns: Vec<String> = raw.columns().to_vec();
    let mut warnings = Vec::new();
    let mut table = OutputTable::new(columns.clone());

    for (row_idx, row) in raw.into_rows().into_iter().enumerate() {
        let normalized = row
            .into_iter()
            .zip(&columns)
            .enumerate()
            .map(|(col, (cell, name))| match value_type(kind, col) {
                ValueType::Date => {
                    let date = parse_date(&cell, &config.date_formats);
                    if date.is_none() && !cell.is_blank() {
                        warnings.push(Warning::UnparseableDate {
                            table: kind,
                            row: row_idx,
                            raw: cell.to_text(),
                        });
                    }
                    Scalar::Date(date)
                }
                ValueType::Text => Scalar::Text(cell.to_text()),
                ValueType::Number => match parse_number(&cell) {
                    Ok(n) => Scalar::Number(n.unwrap_or(0.0)),
                    Err(InvalidNumber) => {
                        warnings.push(Warning::UnparseableNumber {
                            table: kind,
                            row: row_idx,
                            column: name.clone(),
                            raw: cell.to_text(),
                        });
                        Scalar::Number(0.0)
                    }
                },
            })
            .collect();
        table.push_row(normalized);
    }

    if config.undated_rows == UndatedRows::Drop && !table.columns().is_empty() {
        table.retain_rows(|row| row[0].as_date().is_some());
    }

    (table, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> Vec<String> {
        ReshapeConfig::default().date_formats
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_date_text_formats() {
        let f = formats();
        assert_eq!(parse_date(&Cell::from("2024-01-31"), &f), date(2024, 1, 31));
        assert_eq!(parse_date(&Cell::from("2024/1/5"), &f), date(2024, 1, 5));
        assert_eq!(parse_date(&Cell::from("01/05/2024"), &f), date(2024, 1, 5));
        assert_eq!(parse_date(&Cell::from("20240131"), &f), date(2024, 1, 31));
        assert_eq!(parse_date(&Cell::from("2024-01-31 00:00:00"), &f), date(2024, 1, 31));
        assert_eq!(parse_date(&Cell::from("2024-01-31T08:30:00Z"), &f), date(2024, 1, 31));
        assert_eq!(parse_date(&Cell::from("2024年3月1日"), &f), date(2024, 3, 1));
    }

    #[test]
    fn test_parse_date_cells() {
        let f = formats();
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();
        assert_eq!(parse_date(&Cell::DateTime(dt), &f), date(2024, 2, 29));
        // 45292 = 2024-01-01 in the 1900 date system
        assert_eq!(parse_date(&Cell::Number(45292.0), &f), date(2024, 1, 1));
        assert_eq!(parse_date(&Cell::from("45292"), &f), date(2024, 1, 1));
        assert_eq!(parse_date(&Cell::Number(20240101.0), &f), date(2024, 1, 1));
    }

    #[test]
    fn test_unparseable_dates() {
        let f = formats();
        assert_eq!(parse_date(&Cell::Empty, &f), None);
        assert_eq!(parse_date(&Cell::from("Total"), &f), None);
        assert_eq!(parse_date(&Cell::from("2024-13-45"), &f), None);
        assert_eq!(parse_date(&Cell::Number(-3.0), &f), None);
    }

    #[test]
    fn test_excel_serial_with_time() {
        let dt = excel_serial_to_datetime(45292.5).unwrap();
        assert_eq!(dt.to_string(), "2024-01-01 12:00:00");
        assert!(excel_serial_to_datetime(f64::NAN).is_none());
        assert!(excel_serial_to_datetime(1e12).is_none());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&Cell::Number(3.5)), Ok(Some(3.5)));
        assert_eq!(parse_number(&Cell::from("1,234.5")), Ok(Some(1234.5)));
        assert_eq!(parse_number(&Cell::from(" $ 120 ")), Ok(Some(120.0)));
        assert_eq!(parse_number(&Cell::from("NT$300")), Ok(Some(300.0)));
        assert_eq!(parse_number(&Cell::from("(42)")), Ok(Some(-42.0)));
        assert_eq!(parse_number(&Cell::from("-7")), Ok(Some(-7.0)));
        assert_eq!(parse_number(&Cell::Bool(true)), Ok(Some(1.0)));
        assert_eq!(parse_number(&Cell::Empty), Ok(None));
        assert_eq!(parse_number(&Cell::from("   ")), Ok(None));
    }

    #[test]
    fn test_parse_number_rejects() {
        assert_eq!(parse_number(&Cell::from("n/a")), Err(InvalidNumber));
        assert_eq!(parse_number(&Cell::from("NaN")), Err(InvalidNumber));
        assert_eq!(parse_number(&Cell::from("inf")), Err(InvalidNumber));
        assert_eq!(parse_number(&Cell::Number(f64::INFINITY)), Err(InvalidNumber));
    }

    #[test]
    fn test_commas_only_group_thousands() {
        assert_eq!(parse_number(&Cell::from("1,234")), Ok(Some(1234.0)));
        assert_eq!(parse_number(&Cell::from("-12,345,678.9")), Ok(Some(-12_345_678.9)));
        assert_eq!(parse_number(&Cell::from("(1,000)")), Ok(Some(-1000.0)));
        assert_eq!(parse_number(&Cell::from("12,5")), Err(InvalidNumber));
        assert_eq!(parse_number(&Cell::from("1.234,56")), Err(InvalidNumber));
        assert_eq!(parse_number(&Cell::from("1,23,456")), Err(InvalidNumber));
    }

    #[test]
    fn test_decimal_comma_cell_warns() {
        let mut raw = RawTable::new(vec!["Date".into(), "Revenue".into()]);
        raw.push_row(vec![Cell::from("2024-01-01"), Cell::from("12,5")]);
        let (table, warnings) =
            normalize_table(raw, TableKind::Business, &ReshapeConfig::default());
        assert_eq!(table.get(0, "Revenue"), Some(&Scalar::Number(0.0)));
        assert_eq!(
            warnings,
            vec![Warning::UnparseableNumber {
                table: TableKind::Business,
                row: 0,
                column: "Revenue".into(),
                raw: "12,5".into(),
            }]
        );
    }

    #[test]
    fn test_business_columns_named_like_media_are_numeric() {
        let mut raw = RawTable::new(vec!["Date".into(), "Product".into(), "Media".into()]);
        raw.push_row(vec![Cell::from("2024-01-01"), Cell::from("42"), Cell::from("7")]);
        let (table, _) = normalize_table(raw, TableKind::Business, &ReshapeConfig::default());
        assert_eq!(table.get(0, "Product"), Some(&Scalar::Number(42.0)));
        assert_eq!(table.get(0, "Media"), Some(&Scalar::Number(7.0)));
    }

    fn raw_media() -> RawTable {
        let mut raw = RawTable::new(vec![
            "Date".into(),
            "Media".into(),
            "Product".into(),
            "Spend".into(),
        ]);
        raw.push_row(vec![
            Cell::from("2024-01-01"),
            Cell::from("TV"),
            Cell::from("ALL"),
            Cell::from("12.5"),
        ]);
        raw.push_row(vec![
            Cell::from("not a date"),
            Cell::from("TV"),
            Cell::from("ALL"),
            Cell::from("oops"),
        ]);
        raw.push_row(vec![Cell::Empty, Cell::from("TV"), Cell::from("ALL"), Cell::Empty]);
        raw
    }

    #[test]
    fn test_normalize_table_keeps_rows() {
        let (table, warnings) =
            normalize_table(raw_media(), TableKind::Media, &ReshapeConfig::default());
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.get(0, "Date"), Some(&Scalar::Date(date(2024, 1, 1))));
        assert_eq!(table.get(1, "Date"), Some(&Scalar::Date(None)));
        assert_eq!(table.get(0, "Spend"), Some(&Scalar::Number(12.5)));
        assert_eq!(table.get(1, "Spend"), Some(&Scalar::Number(0.0)));
        assert_eq!(table.get(2, "Spend"), Some(&Scalar::Number(0.0)));
        assert_eq!(table.get(2, "Media"), Some(&Scalar::Text("TV".into())));

        // blank cells are missing, not unparseable
        assert_eq!(warnings.len(), 2);
        assert!(warnings.contains(&Warning::UnparseableDate {
            table: TableKind::Media,
            row: 1,
            raw: "not a date".into(),
        }));
        assert!(warnings.contains(&Warning::UnparseableNumber {
            table: TableKind::Media,
            row: 1,
            column: "Spend".into(),
            raw: "oops".into(),
        }));
    }

    #[test]
    fn test_normalize_table_drop_policy() {
        let config = ReshapeConfig {
            undated_rows: UndatedRows::Drop,
            ..ReshapeConfig::default()
        };
        let (table, _) = normalize_table(raw_media(), TableKind::Media, &config);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.get(0, "Spend"), Some(&Scalar::Number(12.5)));
    }

    #[test]
    fn test_numbers_are_finite() {
        let (table, _) =
            normalize_table(raw_media(), TableKind::Media, &ReshapeConfig::default());
        for value in table.column("Spend").unwrap() {
            assert!(value.as_f64().unwrap().is_finite());
        }
    }
}
