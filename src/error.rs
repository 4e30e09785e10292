// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Root failures the scheduler knows how to classify.
///
/// Everything else travels as plain `anyhow::Error` and is logged as `UNEXPECTED_ERROR`.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to write {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot at {} is unreadable: {reason}", path.display())]
    Snapshot { path: PathBuf, reason: String },

    #[error("summarizer failed: {0}")]
    Summarizer(String),

    #[error("{failed} of 3 cycle writes failed (first: {first})")]
    PartialWrite { failed: usize, first: String },
}

impl DigestError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Stable classification code used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Persistence { .. } | Self::PartialWrite { .. } => "PERSISTENCE_ERROR",
            Self::Snapshot { .. } => "SNAPSHOT_ERROR",
            Self::Summarizer(_) => "SUMMARIZER_ERROR",
        }
    }
}

/// Classify an arbitrary error chain for logging.
pub fn classify(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|e| e.downcast_ref::<DigestError>())
        .map(DigestError::code)
        .unwrap_or("UNEXPECTED_ERROR")
}
