// src/ingest/providers/calendar.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::apple::run_command;
use crate::config::AppConfig;
use crate::ingest::types::SourceFetcher;

pub const NAME: &str = "calendar";

const DELIM: &str = " || ";
// icalBuddy answers instantly when it works; fail fast otherwise.
const TIMEOUT: Duration = Duration::from_secs(3);

/// Today's events via the `icalBuddy` CLI (`brew install ical-buddy`).
pub struct CalendarFetcher {
    program: String,
}

pub fn build(_cfg: &AppConfig, _http: &reqwest::Client) -> Arc<dyn SourceFetcher> {
    Arc::new(CalendarFetcher::new("icalBuddy"))
}

impl CalendarFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Collapse icalBuddy's multi-line listing into a single delimited line.
fn render(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        String::new()
    } else {
        format!("Calendar: {}", lines.join(DELIM))
    }
}

#[async_trait]
impl SourceFetcher for CalendarFetcher {
    async fn fetch(&self) -> Result<String> {
        let args = [
            "--includeCalNames",
            "--noRelativeDates",
            "--timeFormat",
            "%H:%M",
            "eventsToday",
        ];
        match run_command(&self.program, &args, None, TIMEOUT).await {
            Ok(raw) => Ok(render(&raw)),
            Err(e) => {
                tracing::warn!(error = ?e, "icalBuddy unavailable");
                Ok(String::new())
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
