//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata key for the originating filename
pub const META_SOURCE: &str = "source";
/// Metadata key for the 1-indexed page number
pub const META_PAGE: &str = "page";
/// Metadata key for the segment type
pub const META_TYPE: &str = "type";

/// A unit of ingested content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Text content
    pub content: String,
    /// Source filename, page number, segment type
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Create a document with a fresh id
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Originating filename, if recorded
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).and_then(|v| v.as_str())
    }
}

/// A contiguous slice of a document's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk ID, derived from the document ID and chunk index
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Metadata inherited from the parent document
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Chunk index within the parent document
    pub chunk_index: u32,
    /// Position within the whole chunk sequence
    pub position: u32,
    /// Character range in the parent document
    pub char_start: usize,
    pub char_end: usize,
}

impl Chunk {
    /// Create a chunk of `document`; the id is stable for a given document and index
    pub fn new(
        document: &Document,
        content: String,
        chunk_index: u32,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v5(&document.id, &chunk_index.to_be_bytes()),
            document_id: document.id,
            content,
            metadata: document.metadata.clone(),
            chunk_index,
            position: 0,
            char_start,
            char_end,
        }
    }

    /// Source filename, if recorded
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).and_then(|v| v.as_str())
    }

    /// Page number, if the chunk comes from a page segment
    pub fn page(&self) -> Option<u32> {
        self.metadata
            .get(META_PAGE)
            .and_then(|v| v.as_u64())
            .map(|p| p as u32)
    }

    /// Segment type, if recorded
    pub fn segment_type(&self) -> Option<&str> {
        self.metadata.get(META_TYPE).and_then(|v| v.as_str())
    }
}

/// Counts derived from extraction output, shown alongside the chat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// Detected tables
    pub tables: usize,
    /// Extracted page segments
    pub text_segments: usize,
    /// Pages in the PDF
    pub pages: u32,
    /// Characters in the markdown export
    pub characters: usize,
}
