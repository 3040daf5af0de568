//! # roisplit - ROI report splitter
//!
//! roisplit turns a marketing ROI report (a wide sheet with a group-label
//! row, a field-name row and daily data rows) into two analysis tables:
//! a wide **Business** table of KPIs and a tidy **Media** table with one row
//! per date and media category.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│  Transform  │────▶│ ROI_Business │
//! │   report    │     │ (auto-enc)  │     │  (reshape)  │     │ ROI_Media    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roisplit::{convert_file, write_outputs, ConvertOptions, OutputFormat};
//!
//! let conversion = convert_file("roi_report.xlsx", &ConvertOptions::default())?;
//! write_outputs(&conversion.output, "out", OutputFormat::Xlsx)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Grid, cells, tables and warnings
//! - [`config`] - Metric vocabulary and policies
//! - [`parser`] - CSV/spreadsheet loading with auto-detection
//! - [`transform`] - Header resolution, classification, pivot, normalization
//! - [`output`] - XLSX / CSV / JSON writers
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Loading
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod output;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ReshapeConfig, UndatedRows};

pub use error::{
    ConfigError, GridError, LoadError, OutputError, PipelineError, PipelineResult, ServerError,
};

pub use models::{
    Cell, ColumnInfo, ColumnRole, Grid, MediaColumn, MediaConvention, OutputTable, RawTable,
    Scalar, Table, TableKind, Warning,
};

pub use parser::{load_grid_bytes, load_grid_file, LoadedGrid, SourceFormat, SourceInfo};

pub use transform::{
    convert_bytes, convert_file, reshape, Conversion, ConvertOptions, ReshapeOutput,
};

pub use output::{write_outputs, write_table, OutputFormat};

pub use api::types::{error_response, UploadResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
