// tests/common/mod.rs
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use personal_digest::config::AppConfig;
use personal_digest::{SourceFetcher, Summarizer};

/// Returns fixed content after an optional delay.
pub struct StubFetcher {
    pub name: &'static str,
    pub content: String,
    pub delay: Duration,
}

pub fn stub(name: &'static str, content: &str, delay_ms: u64) -> Arc<dyn SourceFetcher> {
    Arc::new(StubFetcher {
        name,
        content: content.to_string(),
        delay: Duration::from_millis(delay_ms),
    })
}

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(&self) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok(self.content.clone())
    }
    fn name(&self) -> &'static str {
        self.name
    }
}

pub struct FailingFetcher(pub &'static str);

#[async_trait]
impl SourceFetcher for FailingFetcher {
    async fn fetch(&self) -> Result<String> {
        bail!("{} is down", self.0)
    }
    fn name(&self) -> &'static str {
        self.0
    }
}

pub struct PanickingFetcher(pub &'static str);

#[async_trait]
impl SourceFetcher for PanickingFetcher {
    async fn fetch(&self) -> Result<String> {
        panic!("{} exploded", self.0)
    }
    fn name(&self) -> &'static str {
        self.0
    }
}

/// Records every `(context, prompt)` pair and answers with a fixed reply.
pub struct RecordingSummarizer {
    pub reply: String,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl RecordingSummarizer {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn summarize(&self, context: &str, prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((context.to_string(), prompt.to_string()));
        Ok(self.reply.clone())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

pub struct BrokenSummarizer;

#[async_trait]
impl Summarizer for BrokenSummarizer {
    async fn summarize(&self, _context: &str, _prompt: &str) -> Result<String> {
        bail!("contract violated")
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Config whose output and web directories live under `root`.
pub fn config_in(root: &Path) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        output_dir: root.join("data"),
        web_content_dir: root.join("web"),
        prompt: "Brief for {time}.".to_string(),
        ..AppConfig::default()
    })
}

pub fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hh, mm, ss)
        .unwrap()
}
