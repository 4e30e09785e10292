// src/ingest/providers/meetings.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;

use super::query_readonly;
use crate::config::AppConfig;
use crate::ingest::types::SourceFetcher;

pub const NAME: &str = "meetings";

/// Meeting transcripts from the last 24h. Expects a `transcripts(content, datetime)` table
/// where `datetime` is either unix seconds or an SQLite datetime string.
pub struct MeetingsFetcher {
    db: Option<PathBuf>,
}

pub fn build(cfg: &AppConfig, _http: &reqwest::Client) -> Arc<dyn SourceFetcher> {
    Arc::new(MeetingsFetcher::new(cfg.paths.transcripts_db.clone()))
}

impl MeetingsFetcher {
    pub fn new(db: Option<PathBuf>) -> Self {
        Self { db }
    }
}

fn read_transcripts(conn: &Connection) -> rusqlite::Result<String> {
    let mut stmt = conn.prepare(
        "SELECT content FROM transcripts
         WHERE datetime(datetime, 'unixepoch') > datetime('now', '-1 day')
            OR datetime > datetime('now', '-1 day')
         ORDER BY datetime DESC
         LIMIT 10",
    )?;
    let rows = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if rows.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("Meeting Transcripts:\n{}", rows.join("\n\n---\n\n")))
}

#[async_trait]
impl SourceFetcher for MeetingsFetcher {
    async fn fetch(&self) -> Result<String> {
        Ok(query_readonly(NAME, self.db.clone(), read_transcripts).await)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
