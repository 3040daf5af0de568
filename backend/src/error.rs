//! Error types for the roisplit reshape pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`GridError`] - Structural problems with the input grid (fatal)
//! - [`LoadError`] - Reading a CSV or spreadsheet into a grid
//! - [`ConfigError`] - Loading a reshape configuration
//! - [`OutputError`] - Serializing output tables
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Per-cell data-quality problems are not errors: they are reported as
//! [`crate::models::Warning`] values next to the output tables.
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Grid Errors
// =============================================================================

/// The grid does not have the fixed two-header-row shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Fewer rows than the header layout needs.
    #[error("Malformed grid: expected at least {required} rows, found {found}")]
    TooFewRows { required: usize, found: usize },

    /// The group-label row is too narrow to hold a date column and a data column.
    #[error("Malformed grid: expected at least {required} columns in the group row, found {found}")]
    TooFewColumns { required: usize, found: usize },
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while turning a file into a grid.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// File extension is not a supported tabular format.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to decode text content.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid delimited text.
    #[error("Invalid CSV content: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to open or read a workbook.
    #[error("Invalid spreadsheet: {0}")]
    Spreadsheet(String),

    /// Empty file.
    #[error("Input file is empty")]
    Empty,
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while loading a reshape configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Semantically invalid configuration.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while serializing output tables.
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error.
    #[error("Output IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// XLSX writer error.
    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// JSON error.
    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown output format name.
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline`].
/// It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Grid shape error.
    #[error("{0}")]
    Grid(#[from] GridError),

    /// Loading error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Output error.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

impl PipelineError {
    /// Whether the input itself is unusable (as opposed to an environment failure).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Grid(_)
                | PipelineError::Load(
                    LoadError::UnsupportedFormat(_)
                        | LoadError::Encoding(_)
                        | LoadError::Csv(_)
                        | LoadError::Spreadsheet(_)
                        | LoadError::Empty
                )
        )
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unknown job or table.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for grid shape checks.
pub type GridResult<T> = Result<T, GridError>;

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // GridError -> PipelineError
        let grid_err = GridError::TooFewRows { required: 5, found: 2 };
        let pipeline_err: PipelineError = grid_err.into();
        assert!(pipeline_err.to_string().contains("at least 5 rows"));
        assert!(pipeline_err.is_input_error());

        // LoadError -> PipelineError
        let load_err = LoadError::UnsupportedFormat("pdf".into());
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains("pdf"));
        assert!(pipeline_err.is_input_error());
    }

    #[test]
    fn test_io_error_is_not_input_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let pipeline_err: PipelineError = LoadError::Io(io).into();
        assert!(!pipeline_err.is_input_error());
    }

    #[test]
    fn test_column_error_format() {
        let err = GridError::TooFewColumns { required: 2, found: 1 };
        let msg = err.to_string();
        assert!(msg.contains("Malformed grid"));
        assert!(msg.contains("found 1"));
    }
}
