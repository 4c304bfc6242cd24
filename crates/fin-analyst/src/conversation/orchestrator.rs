//! Retrieval-augmented question answering over a session

use std::sync::Arc;
use std::time::Instant;

use super::session::Session;
use crate::error::{Error, Result};
use crate::generation::{build_context, render_history, PromptFields, PromptTemplate};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::types::{Answer, ScoredChunk, Turn};

/// Retrieves context, renders the prompt and calls the LLM
///
/// Both providers are bound to the credential current at ask time.
pub struct Orchestrator {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    template: PromptTemplate,
    top_k: usize,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        template: PromptTemplate,
        top_k: usize,
    ) -> Self {
        Self {
            llm,
            embedder,
            template,
            top_k,
        }
    }

    /// Answer `question` against the session's document
    ///
    /// On success the user and assistant turns are appended in that order.
    /// When the LLM call fails only the user turn is kept and the error is
    /// returned; retrieval failures surface as [`Error::Retrieval`] and leave
    /// the history untouched.
    pub async fn ask(&self, session: &mut Session, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(Error::InvalidQuestion);
        }

        let index = match session.ready() {
            Some(ready) => Arc::clone(&ready.index),
            None => return Err(Error::NotReady),
        };

        let start = Instant::now();
        let results = index
            .query(self.embedder.as_ref(), question, self.top_k)
            .await
            .map_err(|e| match e {
                Error::Llm(e) => Error::Retrieval(e),
                other => other,
            })?;
        tracing::debug!(
            "Retrieved {} chunks for session {} in {:?}",
            results.len(),
            session.id,
            start.elapsed()
        );

        let prompt = self.render_prompt(&results, session.memory().turns(), question);
        session.memory_mut().push(Turn::user(question));

        match self.llm.complete(&prompt).await {
            Ok(text) => {
                session.memory_mut().push(Turn::assistant(text.clone()));
                tracing::info!(
                    "Answered question for session {} with {} ({} sources, {:?})",
                    session.id,
                    self.llm.model(),
                    results.len(),
                    start.elapsed()
                );
                Ok(Answer::new(text, results))
            }
            Err(e) => {
                tracing::warn!("LLM call failed for session {}: {}", session.id, e);
                Err(Error::Llm(e))
            }
        }
    }

    /// Fill the template from retrieved chunks, prior turns and the question
    pub fn render_prompt(&self, results: &[ScoredChunk], history: &[Turn], question: &str) -> String {
        let context = build_context(results);
        let chat_history = render_history(history);

        self.template.render(&PromptFields {
            context: &context,
            chat_history: &chat_history,
            question,
        })
    }
}
