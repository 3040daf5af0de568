//! REST API types for client integration.

use serde::Serialize;
use serde_json::{json, Value};

use super::jobs::Job;
use crate::models::{ColumnInfo, OutputTable, TableKind, Warning};
use crate::parser::SourceInfo;

/// Response sent after an upload was converted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Job identifier, used for downloads
    pub job_id: String,

    /// Status: "ready" or "warning"
    pub status: String,

    pub business: TableSummary,
    pub media: TableSummary,

    /// Media categories in row-block order
    pub categories: Vec<String>,

    /// Per-column classification
    pub columns: Vec<ColumnInfo>,

    pub warnings: Vec<Warning>,

    pub metadata: ResponseMetadata,
}

/// Shape and first rows of one output table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub file_name: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub preview: OutputTable,
    /// e.g. `/api/download/<job>/business?format=xlsx`
    pub download_url: String,
}

/// Metadata about the upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub file_name: String,
    pub data_rows: usize,
    pub source: SourceInfo,
}

impl UploadResponse {
    pub fn from_job(job: &Job, preview_rows: usize) -> Self {
        let output = &job.conversion.output;
        let summary = |kind: TableKind| {
            let table = output.table(kind);
            TableSummary {
                file_name: format!("{}.xlsx", kind.file_stem()),
                row_count: table.row_count(),
                columns: table.columns().to_vec(),
                preview: table.preview(preview_rows),
                download_url: format!(
                    "/api/download/{}/{}?format=xlsx",
                    job.id,
                    kind.to_string().to_lowercase()
                ),
            }
        };

        UploadResponse {
            job_id: job.id.clone(),
            status: if output.warnings.is_empty() { "ready" } else { "warning" }.to_string(),
            business: summary(TableKind::Business),
            media: summary(TableKind::Media),
            categories: output.categories.clone(),
            columns: output.columns.clone(),
            warnings: output.warnings.clone(),
            metadata: ResponseMetadata {
                file_name: job.file_name.clone(),
                data_rows: output.data_rows,
                source: job.conversion.source.clone(),
            },
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
        "business": null,
        "media": null,
        "warnings": []
    })
}
