//! In-memory flat vector index with cosine ranking

use async_trait::async_trait;

use super::Retriever;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, ScoredChunk};

/// Chunks and their embeddings, searched by exhaustive scan
///
/// The index holds no credential. Queries are embedded with whichever
/// provider the caller passes, so a rotated key takes effect immediately.
pub struct FlatIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
}

impl std::fmt::Debug for FlatIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatIndex")
            .field("chunks", &self.chunks.len())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl FlatIndex {
    /// Embed every chunk in sequential batches and build the index
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::indexing("no chunks to index"));
        }
        if batch_size == 0 {
            return Err(Error::indexing("embedding batch size must be positive"));
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        let total_batches = chunks.len().div_ceil(batch_size);

        for (batch_idx, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
                Error::indexing(format!(
                    "embedding batch {}/{} failed: {}",
                    batch_idx + 1,
                    total_batches,
                    e
                ))
            })?;

            if embeddings.len() != batch.len() {
                return Err(Error::indexing(format!(
                    "embedding batch {}/{} returned {} vectors for {} chunks",
                    batch_idx + 1,
                    total_batches,
                    embeddings.len(),
                    batch.len()
                )));
            }

            tracing::debug!(
                "Embedded batch {}/{} ({} chunks)",
                batch_idx + 1,
                total_batches,
                batch.len()
            );
            vectors.extend(embeddings);
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 {
            return Err(Error::indexing("embedding provider returned empty vectors"));
        }
        if let Some(pos) = vectors.iter().position(|v| v.len() != dimensions) {
            return Err(Error::indexing(format!(
                "dimension mismatch at chunk {}: expected {}, got {}",
                pos,
                dimensions,
                vectors[pos].len()
            )));
        }

        tracing::info!(
            "Built index with {} chunks ({} dimensions, embedder={})",
            chunks.len(),
            dimensions,
            embedder.name()
        );

        Ok(Self {
            chunks,
            vectors,
            dimensions,
        })
    }

    /// Rank chunks against a query vector
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimensions {
            return Err(Error::indexing(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query, v).unwrap_or(0.0) as f32))
            .collect();

        // stable sort keeps chunk order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }
}

#[async_trait]
impl Retriever for FlatIndex {
    async fn query(
        &self,
        embedder: &dyn EmbeddingProvider,
        text: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = embedder.embed(text).await?;
        self.search(&embedding, k)
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn name(&self) -> &str {
        "flat"
    }
}

/// Cosine similarity, `None` for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(dot / denom)
}
