// src/ingest/providers/screentime.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;

use super::apple::{detect_nanoseconds, unix_to_apple};
use super::query_readonly;
use crate::config::AppConfig;
use crate::ingest::types::SourceFetcher;

pub const NAME: &str = "screen_time";

const TOP_APPS: usize = 5;

/// Top apps by focused time over the last 24h, from the CoreDuet knowledge store.
pub struct ScreenTimeFetcher {
    db: Option<PathBuf>,
}

pub fn build(cfg: &AppConfig, _http: &reqwest::Client) -> Arc<dyn SourceFetcher> {
    Arc::new(ScreenTimeFetcher::new(cfg.paths.screen_time_db.clone()))
}

impl ScreenTimeFetcher {
    pub fn new(db: Option<PathBuf>) -> Self {
        Self { db }
    }
}

fn read_usage(conn: &Connection, now_unix: i64) -> rusqlite::Result<String> {
    // A typical session lasts seconds to minutes; huge averages mean nanoseconds.
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG(ZENDDATE - ZSTARTDATE) FROM ZOBJECT WHERE ZSTREAMNAME = '/app/inFocus'",
        [],
        |r| r.get(0),
    )?;
    let is_nanos = detect_nanoseconds(avg.map(|v| v as i64));
    let divisor: f64 = if is_nanos { 1_000_000_000.0 } else { 1.0 };
    let since = unix_to_apple(now_unix - 24 * 60 * 60, is_nanos);

    let mut stmt = conn.prepare(
        "SELECT ZVALUESTRING, SUM(ZENDDATE - ZSTARTDATE) / ?1 AS total
         FROM ZOBJECT
         WHERE ZSTREAMNAME = '/app/inFocus' AND ZSTARTDATE > ?2
         GROUP BY ZVALUESTRING
         ORDER BY total DESC
         LIMIT ?3",
    )?;
    let apps = stmt
        .query_map(rusqlite::params![divisor, since, TOP_APPS as i64], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if apps.is_empty() {
        return Ok(String::new());
    }
    let parts: Vec<String> = apps
        .into_iter()
        .map(|(app, secs)| format!("{app}: {} min", (secs / 60.0).round() as i64))
        .collect();
    Ok(format!("Screen Time (last 24h): {}", parts.join(", ")))
}

#[async_trait]
impl SourceFetcher for ScreenTimeFetcher {
    async fn fetch(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        Ok(query_readonly(NAME, self.db.clone(), move |conn| read_usage(conn, now)).await)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::apple::APPLE_EPOCH_OFFSET;

    #[tokio::test]
    async fn apps_are_ranked_by_minutes() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("knowledgeC.db");
        let now = chrono::Utc::now().timestamp();
        let t = now - APPLE_EPOCH_OFFSET - 3_600;
        {
            let conn = Connection::open(&db).unwrap();
            conn.execute_batch(
                "CREATE TABLE ZOBJECT (ZSTREAMNAME TEXT, ZVALUESTRING TEXT, ZSTARTDATE INTEGER, ZENDDATE INTEGER);",
            )
            .unwrap();
            let rows = [
                ("/app/inFocus", "com.apple.Safari", t, t + 600),
                ("/app/inFocus", "com.apple.Safari", t + 700, t + 1_300),
                ("/app/inFocus", "com.tinyspeck.slack", t, t + 1_500),
                ("/app/inFocus", "com.old.app", t - 3 * 86_400, t - 3 * 86_400 + 9_000),
                ("/device/isLocked", "x", t, t + 99_000),
            ];
            for (stream, app, start, end) in rows {
                conn.execute(
                    "INSERT INTO ZOBJECT VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![stream, app, start, end],
                )
                .unwrap();
            }
        }

        let out = ScreenTimeFetcher::new(Some(db)).fetch().await.unwrap();
        assert_eq!(
            out,
            "Screen Time (last 24h): com.tinyspeck.slack: 25 min, com.apple.Safari: 20 min"
        );
    }
}
