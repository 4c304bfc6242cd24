//! Per-user session state

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::memory::ConversationMemory;
use crate::retrieval::Retriever;
use crate::types::{Document, FinancialSummary};

/// Everything produced by processing one uploaded file
///
/// Index and documents are installed together so they never diverge.
#[derive(Clone)]
pub struct ReadyState {
    pub index: Arc<dyn Retriever>,
    pub documents: Vec<Document>,
    pub summary: FinancialSummary,
    pub filename: String,
    pub chunk_count: usize,
}

impl std::fmt::Debug for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyState")
            .field("index", &self.index.name())
            .field("documents", &self.documents.len())
            .field("summary", &self.summary)
            .field("filename", &self.filename)
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready(ReadyState),
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready(_) => "ready",
        }
    }
}

/// One user's document, index, chat history and credential
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    api_key: Option<String>,
    state: SessionState,
    memory: ConversationMemory,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state.label())
            .field("has_api_key", &self.api_key.is_some())
            .field("turns", &self.memory.len())
            .finish()
    }
}

impl Session {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            api_key,
            state: SessionState::Uninitialized,
            memory: ConversationMemory::new(),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(key.into());
    }

    /// Replace any previous document set and start a fresh conversation
    pub fn install(&mut self, ready: ReadyState) {
        if let SessionState::Ready(previous) = &self.state {
            tracing::info!(
                "Session {} replacing '{}' with '{}'",
                self.id,
                previous.filename,
                ready.filename
            );
        }
        self.state = SessionState::Ready(ready);
        self.memory.clear();
    }

    /// Drop the chat history, keep the index
    pub fn clear_chat(&mut self) {
        self.memory.clear();
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn ready(&self) -> Option<&ReadyState> {
        match &self.state {
            SessionState::Ready(ready) => Some(ready),
            SessionState::Uninitialized => None,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub(crate) fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }
}
