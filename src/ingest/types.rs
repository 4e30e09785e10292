// src/ingest/types.rs
use anyhow::Result;

/// One source's contribution to a cycle.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FetcherResult {
    pub source: String,  // e.g. "weather", "news"
    pub content: String, // raw text handed to the LLM, may be empty
}

impl FetcherResult {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }

    pub fn empty(source: impl Into<String>) -> Self {
        Self::new(source, String::new())
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A single data source.
///
/// Implementations log and return `Ok(String::new())` for expected failures (missing file,
/// denied permission, upstream error). An `Err` is still tolerated: the fan-out folds it into
/// empty content.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<String>;
    fn name(&self) -> &'static str;
}
