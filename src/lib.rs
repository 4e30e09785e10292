// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod markdown;
pub mod metrics;
pub mod partition;
pub mod scheduler;
pub mod summarize;

pub use aggregator::{Aggregator, CycleResult};
pub use config::AppConfig;
pub use error::DigestError;
pub use ingest::types::{FetcherResult, SourceFetcher};
pub use scheduler::{Scheduler, Shutdown};
pub use summarize::{DynSummarizer, Summarizer};
