// src/summarize/gemini.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Summarizer, SUMMARY_EMPTY, SUMMARY_ERROR};
use crate::config::LlmConfig;

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini `generateContent` over REST.
pub struct GeminiSummarizer {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiSummarizer {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("personal-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building gemini http client")?;
        Ok(Self {
            http,
            url: format!(
                "{}/models/{}:generateContent",
                cfg.endpoint.trim_end_matches('/'),
                cfg.model
            ),
            api_key: cfg.api_key.clone(),
        })
    }

    async fn call(&self, context: &str, prompt: &str) -> Result<String> {
        // Instructions first, data second; both as user turns.
        let body = GenerateRequest {
            contents: vec![
                Content {
                    role: "user",
                    parts: vec![Part { text: prompt }],
                },
                Content {
                    role: "user",
                    parts: vec![Part { text: context }],
                },
            ],
        };
        let text = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("gemini request")?
            .error_for_status()
            .context("gemini non-2xx")?
            .text()
            .await
            .context("reading gemini body")?;
        extract_text(&text)
    }
}

/// First candidate's first text part, or [`SUMMARY_EMPTY`] when there is none.
fn extract_text(body: &str) -> Result<String> {
    let resp: GenerateResponse = serde_json::from_str(body).context("decoding gemini json")?;
    let text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.trim().is_empty());
    Ok(match text {
        Some(t) => t,
        None => {
            tracing::warn!("gemini response had no text");
            SUMMARY_EMPTY.to_string()
        }
    })
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, context: &str, prompt: &str) -> Result<String> {
        let t0 = std::time::Instant::now();
        match self.call(context, prompt).await {
            Ok(summary) => {
                tracing::info!(ms = t0.elapsed().as_millis() as u64, chars = summary.len(), "summary generated");
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(error = ?e, "LLM summarization failed");
                Ok(SUMMARY_ERROR.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
