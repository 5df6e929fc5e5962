//! Archive upload and scan endpoint
//!
//! POST /scan takes a multipart form with one file field, `file`, holding a
//! zip archive. The response is the text report as a file download.

use std::future::Future;
use std::io::Cursor;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::services::{scan_archive, ScanError, REPORT_FILE_NAME};
use crate::AppState;

/// Multipart field carrying the archive
pub const UPLOAD_FIELD: &str = "file";

struct Upload {
    file_name: String,
    data: Bytes,
}

/// POST /scan
pub async fn scan_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let multipart = multipart.map_err(|rejection| {
        debug!("Rejected upload body: {}", rejection.body_text());
        ApiError::BadRequest("No file part".to_string())
    })?;

    let upload = read_upload(multipart).await?;
    info!("Scanning upload {} ({} bytes)", upload.file_name, upload.data.len());

    let limits = state.limits.clone();
    let task = tokio::task::spawn_blocking(move || scan_archive(Cursor::new(upload.data), &limits));
    let result = await_scan(task, state.limits.scan_timeout()).await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            if err.status().is_server_error() {
                *state.last_error.write().await = Some(err.to_string());
            }
            return Err(err);
        }
    };

    state.scans_completed.fetch_add(1, Ordering::Relaxed);
    info!(
        "Scan complete: {} records, {} conflicts, {} files skipped",
        outcome.extraction.records.len(),
        outcome.conflicts.len(),
        outcome.extraction.skipped.len()
    );

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", REPORT_FILE_NAME),
        ),
    ];

    Ok((StatusCode::OK, headers, outcome.report()).into_response())
}

/// Pull the `file` field out of the form
///
/// A `file` field without a filename is an ordinary form value, not an
/// upload, and is ignored.
async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        if file_name.is_empty() {
            return Err(ApiError::BadRequest("No selected file".to_string()));
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok(Upload { file_name, data });
    }

    Err(ApiError::BadRequest("No file part".to_string()))
}

/// Wait for a blocking scan, mapping join failures and the deadline
async fn await_scan<T, F>(task: F, timeout: Duration) -> ApiResult<T>
where
    F: Future<Output = Result<Result<T, ScanError>, JoinError>>,
{
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result.map_err(ApiError::from),
        Ok(Err(join_err)) => Err(ApiError::Internal(format!("Scan task failed: {}", join_err))),
        Err(_) => Err(ApiError::Timeout(format!(
            "scan exceeded {} ms",
            timeout.as_millis()
        ))),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Build scan routes with the upload size budget applied
pub fn scan_routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/scan", post(scan_upload))
        .layer(DefaultBodyLimit::max(body_limit))
}
