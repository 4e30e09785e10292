// tests/scheduler_loop.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use common::*;
use personal_digest::{Aggregator, Scheduler, Shutdown};

#[tokio::test]
async fn loop_runs_cycles_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());
    let summarizer = RecordingSummarizer::new("s");
    let agg = Aggregator::new(cfg.clone(), vec![stub("w", "x", 0)], summarizer.clone());
    let shutdown = Shutdown::new();
    let scheduler = Scheduler::new(agg, Duration::from_millis(20), Arc::clone(&shutdown));

    let handle = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(shutdown.request());

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop stops after shutdown")
        .unwrap();

    let ran = summarizer.calls().len();
    assert!(ran >= 1);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(summarizer.calls().len(), ran, "no cycle after shutdown");

    let part = personal_digest::partition::DailyPartition::new(
        &cfg.output_dir,
        Local::now().date_naive(),
    );
    assert!(part.csv_path().exists());
}

#[tokio::test]
async fn no_cycle_starts_when_shutdown_already_requested() {
    let dir = tempfile::tempdir().unwrap();
    let summarizer = RecordingSummarizer::new("s");
    let agg = Aggregator::new(
        config_in(dir.path()),
        vec![stub("w", "x", 0)],
        summarizer.clone(),
    );
    let shutdown = Shutdown::new();
    shutdown.request();
    Scheduler::new(agg, Duration::from_secs(3600), shutdown)
        .run()
        .await;
    assert!(summarizer.calls().is_empty());
}

#[tokio::test]
async fn failed_cycle_is_logged_and_loop_continues() {
    let dir = tempfile::tempdir().unwrap();
    let agg = Aggregator::new(
        config_in(dir.path()),
        vec![stub("w", "x", 0)],
        Arc::new(BrokenSummarizer),
    );
    let shutdown = Shutdown::new();
    let scheduler = Scheduler::new(agg, Duration::from_millis(10), Arc::clone(&shutdown));
    assert!(scheduler.tick().await.is_none());
    assert!(scheduler.tick().await.is_none());
}
