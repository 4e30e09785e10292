// src/history.rs
//! Yesterday's partition, read back for prompt continuity. Never fails: every problem is
//! logged and reported as absence.

use std::path::Path;

use chrono::{Local, NaiveDate};

use crate::ingest::join_context;
use crate::partition::DailyPartition;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviousDay {
    /// Summary of the last row of yesterday's CSV.
    pub summary: Option<String>,
    /// Sections of yesterday's snapshot joined with blank lines.
    pub context: Option<String>,
}

/// Previous day relative to the local clock.
pub async fn load_previous(base: &Path) -> PreviousDay {
    load_previous_for(base, Local::now().date_naive()).await
}

/// Previous day relative to `today`; calendar subtraction, so month and year boundaries work.
pub async fn load_previous_for(base: &Path, today: NaiveDate) -> PreviousDay {
    let Some(yesterday) = today.pred_opt() else {
        return PreviousDay::default();
    };
    let part = DailyPartition::new(base, yesterday);

    let summary = match tokio::fs::read_to_string(part.csv_path()).await {
        Ok(csv) => last_summary(&csv),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(error = %e, path = %part.csv_path().display(), "previous csv unreadable");
            None
        }
    };

    let context = match part.read_snapshot().await {
        Ok(snap) => snap.map(|s| join_context(&s.sections)),
        Err(e) => {
            tracing::warn!(error = ?e, "previous snapshot unreadable");
            None
        }
    };

    PreviousDay { summary, context }
}

/// Final quoted field of the last data row, unescaped. The header row is not a summary.
fn last_summary(csv: &str) -> Option<String> {
    let last = csv.lines().rev().find(|l| !l.trim().is_empty())?;
    let (ts, rest) = last.strip_prefix('"')?.split_once("\",\"")?;
    if ts == "timestamp" {
        return None;
    }
    let field = rest.strip_suffix('"').unwrap_or(rest);
    Some(field.replace("\"\"", "\""))
}
