//! Deterministic provider stubs shared by unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{LlmError, Result};
use crate::providers::{EmbeddingProvider, LlmProvider, ProviderFactory};
use crate::retrieval::Retriever;
use crate::types::ScoredChunk;

const VOCABULARY: [&str; 8] = [
    "revenue", "profit", "assets", "debt", "cash", "equity", "dividend", "margin",
];

/// Embeds text as per-keyword occurrence counts
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, LlmError> {
        Ok(Self::vector(text))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Embedder whose every call fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, LlmError> {
        Err(LlmError::Network("connection refused".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Keyword embedder that records the credential of every query embedding
///
/// Batch (indexing) calls are not recorded.
pub struct RecordingEmbedder {
    key: String,
    keys: Arc<Mutex<Vec<String>>>,
}

impl RecordingEmbedder {
    pub fn new(key: &str) -> Self {
        Self::shared(key, Arc::new(Mutex::new(Vec::new())))
    }

    fn shared(key: &str, keys: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            key: key.to_string(),
            keys,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for RecordingEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, LlmError> {
        self.keys.lock().unwrap().push(self.key.clone());
        Ok(KeywordEmbedder::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, LlmError> {
        Ok(texts.iter().map(|t| KeywordEmbedder::vector(t)).collect())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// LLM returning queued replies and recording every prompt
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, err: LlmError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("No further information.".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// Retriever returning a fixed result list
pub struct StaticRetriever {
    pub results: Vec<ScoredChunk>,
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn query(
        &self,
        _embedder: &dyn EmbeddingProvider,
        _text: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        Ok(self.results.iter().take(k).cloned().collect())
    }

    fn len(&self) -> usize {
        self.results.len()
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Retriever whose every query fails
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn query(
        &self,
        _embedder: &dyn EmbeddingProvider,
        _text: &str,
        _k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        Err(LlmError::Network("embedding endpoint unreachable".into()).into())
    }

    fn len(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Factory handing out keyword embedders and a shared scripted LLM
///
/// Every embedder it builds records the key it was built with on each query.
/// A revoked key gets an embedder whose calls all fail.
pub struct StubProviders {
    pub llm: Arc<ScriptedLlm>,
    query_keys: Arc<Mutex<Vec<String>>>,
    revoked: Option<String>,
}

impl StubProviders {
    pub fn new(llm: Arc<ScriptedLlm>) -> Self {
        Self {
            llm,
            query_keys: Arc::new(Mutex::new(Vec::new())),
            revoked: None,
        }
    }

    pub fn revoke(mut self, api_key: &str) -> Self {
        self.revoked = Some(api_key.to_string());
        self
    }

    /// Keys used for query embeddings, oldest first
    pub fn query_keys(&self) -> Vec<String> {
        self.query_keys.lock().unwrap().clone()
    }
}

impl ProviderFactory for StubProviders {
    fn embedder(&self, api_key: &str) -> Result<Arc<dyn EmbeddingProvider>> {
        if self.revoked.as_deref() == Some(api_key) {
            return Ok(Arc::new(FailingEmbedder));
        }
        Ok(Arc::new(RecordingEmbedder::shared(
            api_key,
            Arc::clone(&self.query_keys),
        )))
    }

    fn llm(&self, _api_key: &str) -> Result<Arc<dyn LlmProvider>> {
        Ok(self.llm.clone())
    }

    fn generate_model(&self) -> &str {
        "scripted-1"
    }

    fn embed_model(&self) -> &str {
        "keyword"
    }
}

/// Smallest well-formed PDF with one page showing `text`
pub fn minimal_pdf(text: &str) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![14.into()]),
        Operation::new("Td", vec![50.into(), 750.into()]),
    ];
    for line in text.lines() {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().unwrap_or_default(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
