//! Prompt templates for financial question answering

use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::types::{ScoredChunk, Turn};

/// Placeholders every template must contain
pub const REQUIRED_PLACEHOLDERS: [&str; 3] = ["context", "chat_history", "question"];

/// Substituted once when the template is built, not per request
const LANGUAGE_PLACEHOLDER: &str = "{response_language}";

const FINANCIAL_ANALYST_TEMPLATE: &str = r#"You are a Financial Analyst AI with deep expertise in analysing company financial documents.

Use the following context to answer the financial analysis question:
{context}

Conversation history:
{chat_history}

Question: {question}

Provide a thorough, professional analysis covering:
1. Analysis of the relevant financial data
2. Interpretation of financial ratios and metrics
3. Insight into the company's performance
4. Recommendations grounded in the data
5. Comparison with industry standards where possible

Answer in {response_language} using an easy-to-follow format.
If the data is insufficient, explain the limitations of the analysis.

Answer:"#;

fn placeholder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct PromptFields<'a> {
    pub context: &'a str,
    pub chat_history: &'a str,
    pub question: &'a str,
}

/// Template validated to contain exactly the known placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Validate and wrap a template string
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();

        let found: BTreeSet<&str> = placeholder_pattern()
            .captures_iter(&template)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();

        let missing: Vec<&str> = REQUIRED_PLACEHOLDERS
            .iter()
            .copied()
            .filter(|p| !found.contains(p))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Prompt(format!(
                "missing placeholders: {}",
                missing.join(", ")
            )));
        }

        let unknown: Vec<&str> = found
            .into_iter()
            .filter(|p| !REQUIRED_PLACEHOLDERS.contains(p))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::Prompt(format!(
                "unknown placeholders: {}",
                unknown.join(", ")
            )));
        }

        Ok(Self { template })
    }

    /// Build a template, filling `{response_language}` first
    pub fn with_language(template: &str, language: &str) -> Result<Self> {
        Self::new(template.replace(LANGUAGE_PLACEHOLDER, language))
    }

    /// Default financial analyst prompt
    pub fn financial_analyst(language: &str) -> Result<Self> {
        Self::with_language(FINANCIAL_ANALYST_TEMPLATE, language)
    }

    /// Substitute all placeholders in one pass
    ///
    /// Field values are inserted verbatim; braces inside them are not
    /// treated as placeholders.
    pub fn render(&self, fields: &PromptFields<'_>) -> String {
        placeholder_pattern()
            .replace_all(&self.template, |caps: &Captures<'_>| match &caps[1] {
                "context" => fields.context.to_string(),
                "chat_history" => fields.chat_history.to_string(),
                "question" => fields.question.to_string(),
                other => format!("{{{}}}", other),
            })
            .into_owned()
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

/// Join retrieved chunk texts with blank lines
pub fn build_context(results: &[ScoredChunk]) -> String {
    results
        .iter()
        .map(|r| r.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render turns as `Human: ...` / `Assistant: ...` lines
pub fn render_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Document};

    #[test]
    fn test_default_template_is_valid() {
        let template = PromptTemplate::financial_analyst("Indonesian").unwrap();
        assert!(template.as_str().contains("Answer in Indonesian"));
        assert!(!template.as_str().contains(LANGUAGE_PLACEHOLDER));
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        let err = PromptTemplate::new("{context}\n{question}").unwrap_err();
        assert!(matches!(err, Error::Prompt(msg) if msg.contains("chat_history")));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = PromptTemplate::new("{context} {chat_history} {question} {ticker}").unwrap_err();
        assert!(matches!(err, Error::Prompt(msg) if msg.contains("ticker")));
    }

    #[test]
    fn test_render_is_single_pass() {
        let template = PromptTemplate::new("C={context}|H={chat_history}|Q={question}").unwrap();
        let rendered = template.render(&PromptFields {
            context: "Revenue was $5M",
            chat_history: "",
            question: "What does {context} mean?",
        });

        assert_eq!(rendered, "C=Revenue was $5M|H=|Q=What does {context} mean?");
    }

    #[test]
    fn test_history_and_context_rendering() {
        let turns = vec![Turn::user("Net margin?"), Turn::assistant("12%")];
        assert_eq!(render_history(&turns), "Human: Net margin?\nAssistant: 12%");
        assert_eq!(render_history(&[]), "");

        let doc = Document::new("a b");
        let results = vec![
            ScoredChunk { chunk: Chunk::new(&doc, "a".into(), 0, 0, 1), score: 0.9 },
            ScoredChunk { chunk: Chunk::new(&doc, "b".into(), 1, 2, 3), score: 0.5 },
        ];
        assert_eq!(build_context(&results), "a\n\nb");
    }
}
