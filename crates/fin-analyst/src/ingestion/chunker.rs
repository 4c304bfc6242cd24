//! Fixed-window text chunking with overlap

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, Document};

/// Text chunker with configurable size and overlap, measured in characters
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk length
    chunk_size: usize,
    /// Characters shared by consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
        }
        .validate()?;

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Distance between the starts of consecutive windows
    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Chunk every document, preserving document order and in-document order
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            for mut chunk in self.chunk_document(doc) {
                chunk.position = chunks.len() as u32;
                chunks.push(chunk);
            }
        }

        chunks
    }

    /// Chunk a single document
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        // Byte offset of every character, plus the end of the string
        let mut bounds: Vec<usize> = doc.content.char_indices().map(|(i, _)| i).collect();
        let len = bounds.len();
        bounds.push(doc.content.len());

        let mut chunks = Vec::new();
        if len == 0 {
            return chunks;
        }

        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(len);
            let text = &doc.content[bounds[start]..bounds[end]];

            chunks.push(Chunk::new(
                doc,
                text.to_string(),
                chunks.len() as u32,
                start,
                end,
            ));

            if end == len {
                break;
            }
            start += self.step();
        }

        chunks
    }

    /// Number of chunks a document of `len` characters produces
    pub fn expected_chunks(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.chunk_size {
            1
        } else {
            (len - self.overlap).div_ceil(self.step())
        }
    }

    /// Join chunks of one document back together, dropping the overlap prefixes
    pub fn reassemble(&self, chunks: &[Chunk]) -> String {
        let mut text = String::new();

        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                text.push_str(&chunk.content);
            } else {
                text.extend(chunk.content.chars().skip(self.overlap));
            }
        }

        text
    }
}
