//! Document upload endpoint

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::{require_api_key, AppState};
use crate::types::FinancialSummary;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub filename: String,
    pub summary: FinancialSummary,
    pub documents: usize,
    pub chunks: usize,
    pub processing_time_ms: u64,
}

/// POST /api/sessions/:id/documents - Upload and process one PDF
///
/// The session stays locked for the whole run, so a concurrent ask on the
/// same session waits for the new index.
pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();
    let handle = state.session(&id)?;

    let mut upload: Option<(String, Option<String>, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, "multipart field", e))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if upload.is_some() {
            return Err(Error::Upload("only one file may be uploaded at a time".into()));
        }

        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(&state, &format!("'{}'", filename), e))?;
        upload = Some((filename, content_type, data));
    }

    let (filename, content_type, data) =
        upload.ok_or_else(|| Error::Upload("no file in request".into()))?;

    let mut session = handle.lock().await;
    let api_key = require_api_key(&session)?;
    let embedder = state.providers().embedder(&api_key)?;

    let ready = state
        .pipeline()
        .process(&filename, content_type.as_deref(), &data, embedder.as_ref())
        .await
        .inspect_err(|e| tracing::error!("Failed to process '{}': {}", filename, e))?;

    let response = UploadResponse {
        session_id: session.id.to_string(),
        filename: ready.filename.clone(),
        summary: ready.summary.clone(),
        documents: ready.documents.len(),
        chunks: ready.chunk_count,
        processing_time_ms: start.elapsed().as_millis() as u64,
    };
    session.install(ready);

    Ok(Json(response))
}

/// Body-limit hits become 413; anything else is a malformed request
fn multipart_error(state: &AppState, what: &str, err: MultipartError) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(format!(
            "uploads are limited to {} bytes",
            state.config().server.max_upload_size
        ))
    } else {
        Error::Upload(format!("Failed to read {}: {}", what, err.body_text()))
    }
}
