//! Question answering endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::{require_api_key, AppState};
use crate::types::{Answer, Citation};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// A retrieved chunk plus its display label, e.g. `[Source: q3.pdf, Page 7]`
#[derive(Debug, Serialize)]
pub struct SourceView {
    pub label: String,
    #[serde(flatten)]
    pub citation: Citation,
}

impl From<Citation> for SourceView {
    fn from(citation: Citation) -> Self {
        Self {
            label: citation.format_inline(),
            citation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub is_error: bool,
    pub sources: Vec<SourceView>,
    pub processing_time_ms: u64,
}

/// POST /api/sessions/:id/ask
///
/// Model failures come back as a 200 with `is_error` set so the chat can
/// show them inline and carry on. Retrieval failures happen before the
/// question is recorded and are returned as regular error responses.
pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let start = Instant::now();
    let handle = state.session(&id)?;
    let mut session = handle.lock().await;

    let api_key = require_api_key(&session)?;
    let orchestrator = state.orchestrator(&api_key)?;

    tracing::info!("Question for session {}: \"{}\"", session.id, request.question);

    let answer = match orchestrator.ask(&mut session, &request.question).await {
        Ok(answer) => answer,
        Err(e @ Error::Llm(_)) => Answer::from_error(&e),
        Err(e) => return Err(e),
    };

    Ok(Json(AskResponse {
        sources: answer.citations().into_iter().map(SourceView::from).collect(),
        is_error: answer.is_error(),
        answer: answer.text,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
