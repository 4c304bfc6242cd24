//! Similarity retrieval over indexed chunks

mod index;

pub use index::{cosine_similarity, FlatIndex};

use async_trait::async_trait;

use crate::error::Result;
use crate::providers::EmbeddingProvider;
use crate::types::ScoredChunk;

/// Default number of chunks returned per query
pub const DEFAULT_TOP_K: usize = 5;

/// Query side of a built index
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Embed `text` with `embedder` and return at most `k` chunks, most
    /// similar first
    async fn query(
        &self,
        embedder: &dyn EmbeddingProvider,
        text: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Number of indexed chunks
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}
