//! Summarizer abstraction: `(context, prompt) -> text`.
//!
//! Implementations swallow provider failures and answer with one of the sentinels below, so a
//! cycle always has something to persist. An `Err` means the implementation broke its contract
//! and fails the cycle.

pub mod gemini;
pub mod prompt;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::LlmConfig;

pub use gemini::GeminiSummarizer;
pub use prompt::build_prompt;

/// Persisted when the provider call fails (network, HTTP status, undecodable body).
pub const SUMMARY_ERROR: &str = "(LLM summarization error)";
/// Persisted when the provider answers without any text.
pub const SUMMARY_EMPTY: &str = "(No summary was generated)";

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, context: &str, prompt: &str) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Deterministic summarizer for `LLM_TEST_MODE=mock` and tests.
pub struct StaticSummarizer {
    text: String,
}

impl StaticSummarizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn summarize(&self, _context: &str, _prompt: &str) -> Result<String> {
        Ok(self.text.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Factory.
///
/// * `LLM_TEST_MODE=mock` gives a [`StaticSummarizer`].
/// * Otherwise a [`GeminiSummarizer`] for `llm`.
pub fn build_summarizer(llm: &LlmConfig) -> Result<DynSummarizer> {
    if std::env::var("LLM_TEST_MODE").is_ok_and(|v| v == "mock") {
        tracing::info!("LLM_TEST_MODE=mock, using static summarizer");
        return Ok(Arc::new(StaticSummarizer::new("(mock summary)")));
    }
    Ok(Arc::new(GeminiSummarizer::new(llm)?))
}
