//! Session management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Session;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{FinancialSummary, Turn};

/// Session snapshot returned to clients
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub state: &'static str,
    pub has_api_key: bool,
    pub filename: Option<String>,
    pub summary: Option<FinancialSummary>,
    pub chunk_count: Option<usize>,
    pub messages: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let ready = session.ready();
        Self {
            session_id: session.id.to_string(),
            state: session.state().label(),
            has_api_key: session.api_key().is_some(),
            filename: ready.map(|r| r.filename.clone()),
            summary: ready.map(|r| r.summary.clone()),
            chunk_count: ready.map(|r| r.chunk_count),
            messages: session.memory().turns().to_vec(),
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub api_key: String,
}

/// POST /api/sessions
pub async fn create_session(State(state): State<AppState>) -> Result<(StatusCode, Json<SessionView>)> {
    let id = state.create_session()?;
    let handle = state.session(&id.to_string())?;
    let session = handle.lock().await;
    Ok((StatusCode::CREATED, Json(SessionView::from(&*session))))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>> {
    let handle = state.session(&id)?;
    let session = handle.lock().await;
    Ok(Json(SessionView::from(&*session)))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.remove_session(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/sessions/:id/credentials
pub async fn set_credentials(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<SessionView>> {
    let key = request.api_key.trim();
    if key.is_empty() {
        return Err(Error::config("API key must not be empty"));
    }

    let handle = state.session(&id)?;
    let mut session = handle.lock().await;
    session.set_api_key(key);
    tracing::info!("Updated API key for session {}", session.id);

    Ok(Json(SessionView::from(&*session)))
}

/// DELETE /api/sessions/:id/messages
pub async fn clear_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>> {
    let handle = state.session(&id)?;
    let mut session = handle.lock().await;
    session.clear_chat();
    tracing::debug!("Cleared chat for session {}", session.id);

    Ok(Json(SessionView::from(&*session)))
}
