// tests/metrics.rs
#![cfg(feature = "strict-metrics")]
mod common;

use std::sync::Arc;

use common::*;
use personal_digest::metrics::Metrics;
use personal_digest::{Aggregator, SourceFetcher};

#[tokio::test]
async fn cycle_metrics_are_exposed() {
    let metrics = Metrics::init().expect("recorder");

    let dir = tempfile::tempdir().unwrap();
    let fetchers: Vec<Arc<dyn SourceFetcher>> =
        vec![stub("weather", "sunny", 0), Arc::new(FailingFetcher("mail"))];
    let agg = Aggregator::new(config_in(dir.path()), fetchers, RecordingSummarizer::new("s"));
    agg.run_cycle_at(at(2025, 3, 9, 8, 0, 0)).await.unwrap();

    let out = metrics.handle.render();
    assert!(out.contains("digest_cycles_total"));
    assert!(out.contains("digest_sections_total"));
    assert!(out.contains("digest_source_errors_total"));
    assert!(out.contains("source=\"mail\""));
    assert!(out.contains("digest_fetch_ms"));
    assert!(out.contains("digest_last_cycle_ts"));
}
