// src/ingest/mod.rs
pub mod providers;
pub mod registry;
pub mod types;

use std::sync::Arc;

use crate::ingest::types::{FetcherResult, SourceFetcher};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_cycles_total", "Cycles that reached the write phase.");
        describe_counter!(
            "digest_cycle_failures_total",
            "Cycles that failed and were skipped by the scheduler."
        );
        describe_counter!(
            "digest_source_errors_total",
            "Fetcher errors or panics folded into empty content."
        );
        describe_counter!(
            "digest_sections_total",
            "Non-empty sections forwarded to the summarizer."
        );
        describe_histogram!("digest_fetch_ms", "Fan-out wall time in milliseconds.");
        describe_histogram!("digest_cycle_ms", "Whole cycle wall time in milliseconds.");
        describe_gauge!("digest_last_cycle_ts", "Unix ts of the last completed cycle.");
    });
}

/// Run every fetcher concurrently and return one result per fetcher, in the order given.
///
/// Tasks are spawned up front and awaited in configuration order, so completion order never
/// leaks into the output. An `Err` or a panic in one task becomes empty content for that
/// source only.
pub async fn fan_out(fetchers: &[Arc<dyn SourceFetcher>]) -> Vec<FetcherResult> {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let handles: Vec<_> = fetchers
        .iter()
        .map(|f| {
            let f = Arc::clone(f);
            (f.name(), tokio::spawn(async move { f.fetch().await }))
        })
        .collect();

    let mut out = Vec::with_capacity(handles.len());
    for (source, handle) in handles {
        let content = match handle.await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, source, "fetcher error");
                counter!("digest_source_errors_total", "source" => source).increment(1);
                String::new()
            }
            Err(e) => {
                tracing::error!(error = %e, source, "fetcher task panicked");
                counter!("digest_source_errors_total", "source" => source).increment(1);
                String::new()
            }
        };
        out.push(FetcherResult::new(source, content));
    }

    histogram!("digest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    out
}

/// Drop blank sections; order is preserved.
pub fn non_empty(results: Vec<FetcherResult>) -> Vec<FetcherResult> {
    results.into_iter().filter(|r| !r.is_blank()).collect()
}

/// Join section contents with a blank line, in section order.
pub fn join_context(sections: &[FetcherResult]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fetch, filter and merge in one go. Returns `(sections, full_context)`.
pub async fn collect(fetchers: &[Arc<dyn SourceFetcher>]) -> (Vec<FetcherResult>, String) {
    let sections = non_empty(fan_out(fetchers).await);
    let context = join_context(&sections);
    counter!("digest_sections_total").increment(sections.len() as u64);
    (sections, context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_sections_are_dropped_in_order() {
        let raw = vec![
            FetcherResult::new("a", "first"),
            FetcherResult::new("b", "  \n\t"),
            FetcherResult::empty("c"),
            FetcherResult::new("d", "last"),
        ];
        let kept = non_empty(raw);
        let names: Vec<_> = kept.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(names, vec!["a", "d"]);
        assert_eq!(join_context(&kept), "first\n\nlast");
    }

    #[test]
    fn join_of_nothing_is_empty() {
        assert_eq!(join_context(&[]), "");
    }
}
