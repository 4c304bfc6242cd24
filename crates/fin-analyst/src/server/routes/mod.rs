//! API routes for the analyst server

pub mod ask;
pub mod ingest;
pub mod sessions;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/info", get(info))
        .route("/sample-questions", get(sample_questions))
        // Sessions
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/:id/credentials", put(sessions::set_credentials))
        .route("/sessions/:id/messages", delete(sessions::clear_messages))
        // Upload with a larger body limit
        .route(
            "/sessions/:id/documents",
            post(ingest::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/sessions/:id/ask", post(ask::ask))
}

/// GET /api/info
async fn info(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    Json(json!({
        "name": "fin-analyst",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chat with financial PDF reports using retrieval-augmented Gemini answers",
        "models": {
            "generate": state.providers().generate_model(),
            "embed": state.providers().embed_model(),
        },
        "chunking": {
            "chunk_size": config.chunking.chunk_size,
            "chunk_overlap": config.chunking.chunk_overlap,
        },
        "retrieval": {
            "top_k": config.retrieval.top_k,
        },
        "response_language": config.prompt.response_language,
        "max_upload_size": config.server.max_upload_size,
        "sessions": {
            "active": state.session_count(),
            "max": config.server.max_sessions,
            "ttl_secs": config.server.session_ttl_secs,
        },
    }))
}

/// GET /api/sample-questions
async fn sample_questions(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "questions": state.config().prompt.sample_questions }))
}
