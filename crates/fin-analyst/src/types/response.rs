//! Answer and citation types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Chunk;
use crate::error::Error;

/// Prefix marking an answer that reports a failure instead of model output
pub const ERROR_MARKER: &str = "Error: ";

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity, higher is more similar
    pub score: f32,
}

/// Result of asking a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Model output, or an error-marked message
    pub text: String,
    /// Retrieved chunks, used only as provenance
    pub sources: Vec<ScoredChunk>,
    is_error: bool,
}

impl Answer {
    /// A successful answer
    pub fn new(text: impl Into<String>, sources: Vec<ScoredChunk>) -> Self {
        Self {
            text: text.into(),
            sources,
            is_error: false,
        }
    }

    /// Render a failed ask so it can be shown inline in the chat
    pub fn from_error(err: &Error) -> Self {
        Self {
            text: format!("{}{}", ERROR_MARKER, err),
            sources: Vec::new(),
            is_error: true,
        }
    }

    /// Whether this answer reports a failure
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Citations for the retrieved sources
    pub fn citations(&self) -> Vec<Citation> {
        self.sources.iter().map(Citation::from_scored).collect()
    }
}

/// Citation from a source chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: Option<String>,
    /// Page number (for page segments)
    pub page_number: Option<u32>,
    /// Segment type (for page segments)
    pub segment_type: Option<String>,
    /// Exact snippet from the source
    pub snippet: String,
    /// Similarity score
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a retrieved chunk
    pub fn from_scored(scored: &ScoredChunk) -> Self {
        let chunk = &scored.chunk;
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            filename: chunk.source().map(str::to_string),
            page_number: chunk.page(),
            segment_type: chunk.segment_type().map(str::to_string),
            snippet: chunk.content.clone(),
            similarity_score: scored.score,
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        let mut parts = vec![self.filename.clone().unwrap_or_else(|| "document".to_string())];

        if let Some(page) = self.page_number {
            parts.push(format!("Page {}", page));
        }

        format!("[Source: {}]", parts.join(", "))
    }
}
