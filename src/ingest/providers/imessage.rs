// src/ingest/providers/imessage.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::apple::{apple_to_datetime, detect_nanosecond_timestamps, unix_to_apple};
use super::query_readonly;
use crate::config::AppConfig;
use crate::ingest::types::SourceFetcher;

pub const NAME: &str = "imessage";

const LOOKBACK_SECS: i64 = 14 * 24 * 60 * 60;
const MAX_ROWS: usize = 20;

/// Recent messages of selected chats, read from the Messages `chat.db`.
pub struct IMessageFetcher {
    db: Option<PathBuf>,
    chats: Vec<String>,
}

pub fn build(cfg: &AppConfig, _http: &reqwest::Client) -> Arc<dyn SourceFetcher> {
    Arc::new(IMessageFetcher::new(
        cfg.paths.imessage_db.clone(),
        cfg.imessage_chats.clone(),
    ))
}

impl IMessageFetcher {
    pub fn new(db: Option<PathBuf>, chats: Vec<String>) -> Self {
        Self { db, chats }
    }
}

fn read_messages(conn: &Connection, chats: &[String], now_unix: i64) -> rusqlite::Result<String> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG(date) FROM (SELECT date FROM message LIMIT 10)",
        [],
        |r| r.get(0),
    )?;
    let is_nanos = detect_nanosecond_timestamps(avg.map(|v| v as i64));
    let since = unix_to_apple(now_unix - LOOKBACK_SECS, is_nanos);

    let placeholders = vec!["?"; chats.len()].join(",");
    let sql = format!(
        "SELECT c.chat_identifier, m.text, m.is_from_me, m.date
         FROM chat AS c
         JOIN chat_message_join AS cmj ON cmj.chat_id = c.ROWID
         JOIN message AS m ON m.ROWID = cmj.message_id
         WHERE c.chat_identifier IN ({placeholders}) AND m.date > ?
         ORDER BY m.date DESC
         LIMIT {}",
        MAX_ROWS * chats.len()
    );
    let mut params: Vec<Value> = chats.iter().map(|c| Value::Text(c.clone())).collect();
    params.push(Value::Integer(since));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, Option<String>>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, i64>(3)?,
        ))
    })?;

    // Chats keep the order in which their newest message appears.
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for row in rows {
        let (chat, text, from_me, date) = row?;
        let ts = apple_to_datetime(date, is_nanos)
            .map(|dt| dt.with_timezone(&Local).format("%d/%m/%Y, %H:%M:%S").to_string())
            .unwrap_or_default();
        let dir = if from_me != 0 { "→" } else { "←" };
        let msg = text.unwrap_or_else(|| "[(attachment or empty)]".to_string());
        let line = format!("* {ts} {dir} {msg}");
        match grouped.iter_mut().find(|(c, _)| *c == chat) {
            Some((_, lines)) => lines.push(line),
            None => grouped.push((chat, vec![line])),
        }
    }

    Ok(grouped
        .into_iter()
        .map(|(chat, lines)| {
            let shown: Vec<String> = lines.into_iter().take(MAX_ROWS).collect();
            format!("iMessage ({chat}):\n{}", shown.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n\n"))
}

#[async_trait]
impl SourceFetcher for IMessageFetcher {
    async fn fetch(&self) -> Result<String> {
        if self.chats.is_empty() {
            tracing::debug!("no iMessage chats configured");
            return Ok(String::new());
        }
        let chats = self.chats.clone();
        let now = chrono::Utc::now().timestamp();
        Ok(query_readonly(NAME, self.db.clone(), move |conn| {
            read_messages(conn, &chats, now)
        })
        .await)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::apple::APPLE_EPOCH_OFFSET;

    fn seed(path: &std::path::Path, now: i64) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE chat (ROWID INTEGER PRIMARY KEY, chat_identifier TEXT);
             CREATE TABLE message (ROWID INTEGER PRIMARY KEY, text TEXT, is_from_me INTEGER, date INTEGER);
             CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
             INSERT INTO chat VALUES (1, '+4470000'), (2, 'family'), (3, 'muted');",
        )
        .unwrap();
        let apple_now = now - APPLE_EPOCH_OFFSET;
        let msgs: [(i64, i64, Option<&str>, i64, i64); 5] = [
            (1, 1, Some("see you at 6"), 1, apple_now - 60),
            (2, 1, Some("ok"), 0, apple_now - 120),
            (3, 2, None, 0, apple_now - 30),
            (4, 3, Some("ignored chat"), 0, apple_now - 10),
            (5, 1, Some("ancient"), 0, apple_now - 30 * 86_400),
        ];
        for (id, chat, text, me, date) in msgs {
            conn.execute(
                "INSERT INTO message VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, text, me, date],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO chat_message_join VALUES (?1, ?2)",
                rusqlite::params![chat, id],
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn selected_chats_are_grouped_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("chat.db");
        let now = chrono::Utc::now().timestamp();
        seed(&db, now);

        let f = IMessageFetcher::new(Some(db), vec!["+4470000".into(), "family".into()]);
        let out = f.fetch().await.unwrap();

        let family = out.find("iMessage (family):").unwrap();
        let phone = out.find("iMessage (+4470000):").unwrap();
        assert!(family < phone, "{out}");
        assert!(out.contains("← [(attachment or empty)]"));
        assert!(out.contains("→ see you at 6"));
        assert!(out.contains("← ok"));
        assert!(!out.contains("ignored chat"));
        assert!(!out.contains("ancient"));
    }

    #[tokio::test]
    async fn missing_database_is_empty() {
        let f = IMessageFetcher::new(Some("/nonexistent/chat.db".into()), vec!["x".into()]);
        assert_eq!(f.fetch().await.unwrap(), "");
    }
}
