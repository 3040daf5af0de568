//! High-level pipeline: load a report, reshape it, report progress.
//!
//! The steps are loading the grid, resolving and classifying columns,
//! building both tables, then normalizing them. Progress goes to the
//! broadcast logger so the CLI and SSE clients see the same messages.
//!
//! # Example
//!
//! ```rust,ignore
//! use roisplit::{convert_file, ConvertOptions};
//!
//! let conversion = convert_file("roi_report.xlsx", &ConvertOptions::default())?;
//! println!("{} media rows", conversion.output.media.row_count());
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use super::reshape::{reshape, ReshapeOutput};
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::config::ReshapeConfig;
use crate::error::PipelineResult;
use crate::models::{ColumnRole, Warning};
use crate::parser::{load_grid_bytes, load_grid_file, LoadedGrid, SourceFormat, SourceInfo};

/// How many warnings of each kind are logged one by one.
const WARNINGS_PER_KIND: usize = 3;

/// Options for the conversion pipeline
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Vocabulary and policies for the reshape engine
    pub config: ReshapeConfig,

    /// Number of rows shown in previews
    pub preview_rows: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            config: ReshapeConfig::default(),
            preview_rows: 10,
        }
    }
}

/// Result of a complete conversion
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Where the grid came from
    pub source: SourceInfo,

    /// Both output tables and the column analysis
    pub output: ReshapeOutput,
}

/// Convert a report file.
pub fn convert_file(path: impl AsRef<Path>, options: &ConvertOptions) -> PipelineResult<Conversion> {
    let path = path.as_ref();
    log_info(format!("📖 Reading {}...", path.display()));
    let loaded = load_grid_file(path).map_err(|e| {
        log_error(format!("Could not read {}: {}", path.display(), e));
        e
    })?;
    convert_loaded(loaded, options)
}

/// Convert an uploaded report; `file_name` selects the reader.
pub fn convert_bytes(bytes: &[u8], file_name: &str, options: &ConvertOptions) -> PipelineResult<Conversion> {
    log_info(format!("📖 Reading {} ({} bytes)...", file_name, bytes.len()));
    let loaded = load_grid_bytes(bytes, file_name).map_err(|e| {
        log_error(format!("Could not read {}: {}", file_name, e));
        e
    })?;
    convert_loaded(loaded, options)
}

fn convert_loaded(loaded: LoadedGrid, options: &ConvertOptions) -> PipelineResult<Conversion> {
    let LoadedGrid { grid, source } = loaded;
    log_source(&source);

    log_info("🔍 Resolving header rows...");
    let output = reshape(&grid, &options.config).map_err(|e| {
        log_error(e.to_string());
        e
    })?;

    log_layout(&output);
    log_tables(&output);
    log_warnings(&output.warnings);

    Ok(Conversion { source, output })
}

fn log_source(source: &SourceInfo) {
    match source.format {
        SourceFormat::Delimited => {
            if let Some(ref enc) = source.encoding {
                log_success(format!("Detected encoding: {}", enc));
            }
            if let Some(d) = source.delimiter {
                log_success(format!("Detected separator: '{}'", format_delimiter(d)));
            }
        }
        SourceFormat::Spreadsheet => {
            if let Some(ref sheet) = source.sheet {
                log_success(format!("Reading sheet: {}", sheet));
            }
        }
    }
    log_success(format!(
        "Read {} rows x {} columns",
        source.row_count, source.column_count
    ));
}

fn log_layout(output: &ReshapeOutput) {
    let count = |role: ColumnRole| output.columns.iter().filter(|c| c.role == role).count();
    log_info(format!("📋 {} data rows", output.data_rows));
    log_info_indent(
        format!(
            "{} KPI column(s), {} media column(s), {} excluded",
            count(ColumnRole::Business),
            count(ColumnRole::Media),
            count(ColumnRole::Excluded)
        ),
        1,
    );
    if !output.categories.is_empty() {
        log_info_indent(format!("Media categories: {}", output.categories.join(", ")), 1);
    }
}

fn log_tables(output: &ReshapeOutput) {
    log_info("📦 Building tables...");
    log_success(format!(
        "Business: {} rows x {} columns",
        output.business.row_count(),
        output.business.column_count()
    ));
    log_success(format!(
        "Media: {} rows x {} columns",
        output.media.row_count(),
        output.media.column_count()
    ));
}

fn log_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        log_success("All cells read cleanly");
        return;
    }

    let mut by_kind: BTreeMap<&'static str, Vec<&Warning>> = BTreeMap::new();
    for w in warnings {
        by_kind.entry(warning_kind(w)).or_default().push(w);
    }

    log_warning(format!("{} warning(s) while reading cells", warnings.len()));
    for (kind, items) in by_kind {
        for w in items.iter().take(WARNINGS_PER_KIND) {
            log_warning(w.to_string());
        }
        if items.len() > WARNINGS_PER_KIND {
            log_warning(format!(
                "... and {} more {}",
                items.len() - WARNINGS_PER_KIND,
                kind
            ));
        }
    }
}

fn warning_kind(warning: &Warning) -> &'static str {
    match warning {
        Warning::UnparseableDate { .. } => "unreadable dates",
        Warning::UnparseableNumber { .. } => "unreadable numbers",
        Warning::NoMatchingColumns { .. } => "empty tables",
        Warning::BlankFieldName { .. } => "unnamed columns",
    }
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GridError, LoadError, PipelineError};
    use crate::models::Scalar;

    #[test]
    fn test_format_delimiter() {
        assert_eq!(format_delimiter(';'), ";");
        assert_eq!(format_delimiter('\t'), "TAB");
        assert_eq!(format_delimiter('#'), "?");
    }

    const REPORT: &str = "ROI export,,,,\n\
                          ,KPI,MEDIA,MEDIA,MEDIA\n\
                          ,,,,\n\
                          Date,Revenue,fb_imp,fb_click,tv_spend\n\
                          2024-01-01,1000,5000,120,300\n\
                          2024-01-02,1100,5200,130,310\n";

    #[test]
    fn test_convert_csv_bytes() {
        let conversion =
            convert_bytes(REPORT.as_bytes(), "report.csv", &ConvertOptions::default()).unwrap();

        assert_eq!(conversion.source.format, SourceFormat::Delimited);
        assert_eq!(conversion.source.delimiter, Some(','));
        assert_eq!(conversion.output.business.row_count(), 2);
        assert_eq!(conversion.output.media.row_count(), 4);
        assert_eq!(
            conversion.output.media.get(1, "Clicks"),
            Some(&Scalar::Number(130.0))
        );
    }

    #[test]
    fn test_convert_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, REPORT.replace(',', ";")).unwrap();

        let conversion = convert_file(&path, &ConvertOptions::default()).unwrap();
        assert_eq!(conversion.source.delimiter, Some(';'));
        assert_eq!(conversion.output.categories, vec!["FB", "TV"]);
    }

    #[test]
    fn test_malformed_grid_is_an_error() {
        let err = convert_bytes(b"Date,Revenue\n2024-01-01,1\n", "short.csv", &ConvertOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Grid(GridError::TooFewRows { .. })));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = convert_bytes(REPORT.as_bytes(), "report.pdf", &ConvertOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load(LoadError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_warning_kinds() {
        assert_eq!(
            warning_kind(&Warning::NoMatchingColumns {
                table: crate::models::TableKind::Media
            }),
            "empty tables"
        );
        log_warnings(&[]);
    }
}
