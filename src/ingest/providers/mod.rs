// src/ingest/providers/mod.rs
pub mod apple;
pub mod calendar;
pub mod health;
pub mod imessage;
pub mod mail;
pub mod meetings;
pub mod news;
pub mod screentime;
pub mod weather;

use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};

/// Run `query` against a read-only SQLite database on the blocking pool.
///
/// Missing path, open failure, query failure or a panic all come back as empty content
/// with a warning naming `source`.
pub(crate) async fn query_readonly<F>(source: &'static str, path: Option<PathBuf>, query: F) -> String
where
    F: FnOnce(&Connection) -> rusqlite::Result<String> + Send + 'static,
{
    let Some(path) = path else {
        tracing::debug!(source, "database path not configured");
        return String::new();
    };
    let shown = path.display().to_string();
    let res = tokio::task::spawn_blocking(move || {
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        query(&conn)
    })
    .await;

    match res {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, source, db = %shown, "database query failed");
            String::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, source, "database task aborted");
            String::new()
        }
    }
}
