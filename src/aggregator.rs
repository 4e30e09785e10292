// src/aggregator.rs
//! One cycle: fan out, merge, summarize with continuity, then the three writes.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::error::DigestError;
use crate::history;
use crate::ingest::{self, registry, types::FetcherResult, types::SourceFetcher};
use crate::markdown::MarkdownWriter;
use crate::partition::{DailyPartition, Snapshot, TIMESTAMP_FORMAT};
use crate::summarize::{build_prompt, build_summarizer, DynSummarizer};

#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    pub summary: String,
    pub full_context: String,
    pub sections: Vec<FetcherResult>,
    pub timestamp: String,
    pub markdown_index: u32,
}

pub struct Aggregator {
    config: Arc<AppConfig>,
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    summarizer: DynSummarizer,
    markdown: MarkdownWriter,
}

impl Aggregator {
    /// Production wiring: fetchers from the source table, summarizer from the LLM config.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self> {
        let http = registry::http_client()?;
        let fetchers = registry::build_enabled(&config, &http);
        let summarizer = build_summarizer(&config.llm)?;
        info!(
            sources = ?registry::enabled_names(&config),
            summarizer = summarizer.name(),
            "aggregator ready"
        );
        Ok(Self::new(config, fetchers, summarizer))
    }

    /// `fetchers` run in the given order; that order is the section order.
    pub fn new(
        config: Arc<AppConfig>,
        fetchers: Vec<Arc<dyn SourceFetcher>>,
        summarizer: DynSummarizer,
    ) -> Self {
        let markdown = MarkdownWriter::new(&config.web_content_dir);
        Self {
            config,
            fetchers,
            summarizer,
            markdown,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn partition_for(&self, date: NaiveDate) -> DailyPartition {
        DailyPartition::new(&self.config.output_dir, date)
    }

    /// Create the day's directory and CSV header if needed.
    pub async fn ensure_partition(&self, date: NaiveDate) -> Result<()> {
        self.partition_for(date).ensure().await
    }

    pub async fn run_cycle(&self) -> Result<CycleResult> {
        self.run_cycle_at(Local::now().naive_local()).await
    }

    /// Run a cycle as if triggered at `now` (local time). `now` is used for every write.
    pub async fn run_cycle_at(&self, now: NaiveDateTime) -> Result<CycleResult> {
        ingest::ensure_metrics_described();
        let t0 = std::time::Instant::now();
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let date = now.date();
        debug!(%timestamp, fetchers = self.fetchers.len(), "cycle start");

        let (sections, full_context) = ingest::collect(&self.fetchers).await;

        let previous = history::load_previous_for(&self.config.output_dir, date).await;
        let time = now.format("%H:%M").to_string();
        let prompt = build_prompt(&self.config.prompt, previous.summary.as_deref(), &time);
        debug!(
            continuity = previous.summary.is_some(),
            previous_context = previous.context.is_some(),
            context_chars = full_context.len(),
            "summarizing"
        );

        let summary = self
            .summarizer
            .summarize(&full_context, &prompt)
            .await
            .map_err(|e| anyhow::Error::new(DigestError::Summarizer(format!("{e:#}"))))?;

        counter!("digest_cycles_total").increment(1);

        let partition = self.partition_for(date);
        let snapshot = Snapshot {
            timestamp: timestamp.clone(),
            sections: sections.clone(),
        };
        let (csv, snap, md) = tokio::join!(
            partition.append_row(&timestamp, &summary),
            partition.write_snapshot(&snapshot),
            async {
                let index = self.markdown.next_index(date).await?;
                self.markdown
                    .write(now, index, &partition.relative_snapshot_path(), &summary)
                    .await?;
                Ok::<u32, anyhow::Error>(index)
            }
        );

        let mut failures = Vec::new();
        if let Err(e) = csv {
            error!(error = ?e, "csv append failed");
            failures.push(format!("csv: {e:#}"));
        }
        if let Err(e) = snap {
            error!(error = ?e, "snapshot write failed");
            failures.push(format!("snapshot: {e:#}"));
        }
        let markdown_index = match md {
            Ok(i) => i,
            Err(e) => {
                error!(error = ?e, "markdown write failed");
                failures.push(format!("markdown: {e:#}"));
                0
            }
        };
        if let Some(first) = failures.first() {
            return Err(DigestError::PartialWrite {
                failed: failures.len(),
                first: first.clone(),
            }
            .into());
        }

        histogram!("digest_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("digest_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(sections = sections.len(), index = markdown_index, %timestamp, "cycle written");

        Ok(CycleResult {
            summary,
            full_context,
            sections,
            timestamp,
            markdown_index,
        })
    }
}
