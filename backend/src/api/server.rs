//! HTTP server for the roisplit API.
//!
//! # API Endpoints
//!
//! | Method | Path                                   | Description                      |
//! |--------|----------------------------------------|----------------------------------|
//! | GET    | `/health`                              | Health check                     |
//! | POST   | `/api/upload`                          | Upload a report for conversion   |
//! | GET    | `/api/download/{job_id}/{table}`       | Download `ROI_Business`/`ROI_Media` |
//! | GET    | `/api/logs`                            | SSE stream for real-time logs    |
//!
//! The upload form takes the report in a `file` field and optionally a
//! `config` field holding a JSON reshape config for this upload only.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::jobs::{Job, JOBS};
use super::logs::{log_info, log_success, LOG_BROADCASTER};
use super::types::{error_response, UploadResponse};
use crate::config::ReshapeConfig;
use crate::error::{OutputError, PipelineError, ServerError, ServerResult};
use crate::models::TableKind;
use crate::output::{write_table, OutputFormat};
use crate::transform::pipeline::{convert_bytes, ConvertOptions};

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared handler state
#[derive(Clone)]
struct AppState {
    options: Arc<ConvertOptions>,
}

/// Start the HTTP server
pub async fn start_server(port: u16, options: ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let state = AppState {
        options: Arc::new(options),
    };

    let app = router(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 roisplit server running on http://localhost:{}", port);
    println!("   POST /api/upload                   - Upload CSV/XLSX report");
    println!("   GET  /api/download/{{job}}/{{table}} - Download a table");
    println!("   GET  /api/logs                     - SSE log stream");
    println!("   GET  /health                       - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_report))
        .route("/api/download/{job_id}/{table}", get(download_table))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Pipeline(PipelineError::Grid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "roisplit",
        "version": env!("CARGO_PKG_VERSION"),
        "jobs": JOBS.len(),
        "endpoints": {
            "upload": "POST /api/upload",
            "download": "GET /api/download/{jobId}/{business|media}?format=xlsx|csv|json",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // lagged receivers skip the missed entries
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: convert a report and keep the result for download.
async fn upload_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let mut file: Option<(String, Bytes)> = None;
    let mut config_json: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file = Some((file_name, data));
            }
            "config" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                config_json = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    let mut options = (*state.options).clone();
    if let Some(json) = config_json.filter(|j| !j.trim().is_empty()) {
        options.config = ReshapeConfig::from_json(&json)
            .map_err(|e| ServerError::BadRequest(format!("Invalid config: {}", e)))?;
    }

    log_info(format!("📄 New upload: {} ({} bytes)", file_name, bytes.len()));

    let name = file_name.clone();
    let conversion = tokio::task::spawn_blocking(move || convert_bytes(&bytes, &name, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    let job = JOBS.insert(Job::new(file_name, conversion));
    log_success(format!("Job {} ready", job.id));

    Ok(Json(UploadResponse::from_job(&job, state.options.preview_rows)))
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    format: Option<String>,
}

/// Download one table of a finished job.
async fn download_table(
    Path((job_id, table)): Path<(String, String)>,
    Query(query): Query<DownloadQuery>,
) -> ServerResult<Response> {
    let kind: TableKind = table.parse().map_err(ServerError::NotFound)?;
    let format: OutputFormat = match query.format.as_deref() {
        Some(f) => f
            .parse()
            .map_err(|e: OutputError| ServerError::BadRequest(e.to_string()))?,
        None => OutputFormat::default(),
    };
    let job = JOBS
        .get(&job_id)
        .ok_or_else(|| ServerError::NotFound(format!("job '{}'", job_id)))?;

    let body = tokio::task::spawn_blocking(move || {
        write_table(job.conversion.output.table(kind), format)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))?
    .map_err(PipelineError::from)?;

    let disposition = format!("attachment; filename=\"{}\"", format.file_name(kind));
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GridError, LoadError};

    #[test]
    fn test_error_status_codes() {
        let grid = ServerError::Pipeline(PipelineError::Grid(GridError::TooFewRows {
            required: 5,
            found: 1,
        }));
        assert_eq!(grid.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let load = ServerError::Pipeline(PipelineError::Load(LoadError::Empty));
        assert_eq!(load.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = ServerError::NotFound("job 'x'".to_string());
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let io = ServerError::Pipeline(PipelineError::Load(LoadError::Io(
            std::io::Error::new(std::io::ErrorKind::Other, "disk"),
        )));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_download_finished_job() {
        let csv = ",,\n,KPI,MEDIA\n,,\nDate,Revenue,fb_spend\n2024-01-01,1,2\n";
        let conversion =
            convert_bytes(csv.as_bytes(), "r.csv", &ConvertOptions::default()).unwrap();
        let job = JOBS.insert(Job::new("r.csv", conversion));

        let response = download_table(
            Path((job.id.clone(), "media".to_string())),
            Query(DownloadQuery {
                format: Some("csv".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"ROI_Media.csv\""
        );
    }

    #[tokio::test]
    async fn test_download_unknown_job() {
        let err = download_table(
            Path(("nope".to_string(), "business".to_string())),
            Query(DownloadQuery { format: None }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_download_bad_table_and_format() {
        let err = download_table(
            Path(("nope".to_string(), "kpi".to_string())),
            Query(DownloadQuery { format: None }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));

        let err = download_table(
            Path(("nope".to_string(), "media".to_string())),
            Query(DownloadQuery {
                format: Some("pdf".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }
}
