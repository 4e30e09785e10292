// src/partition.rs
//! Day-partitioned persistence: `<base>/<YYYY>/<MM>/<DD>.csv` (append-only summary log) and
//! `<base>/<YYYY>/<MM>/<DD>.ctx.br` (Brotli JSON snapshot of the latest cycle's sections).

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::DigestError;
use crate::ingest::types::FetcherResult;

pub const CSV_HEADER: &str = "\"timestamp\",\"summary\"\n";
/// Cycle timestamp format shared by the CSV, the snapshot and the markdown front-matter.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BROTLI_QUALITY: u32 = 11;
const BROTLI_LGWIN: u32 = 22;
const BROTLI_BUFFER: usize = 4096;

/// Raw sections of the latest cycle of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub sections: Vec<FetcherResult>,
}

/// Double embedded quotes and flatten CR, LF and CRLF to a single space.
pub fn escape_csv_field(s: &str) -> String {
    s.replace('"', "\"\"")
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
}

/// One CSV line, newline included.
pub fn format_row(timestamp: &str, summary: &str) -> String {
    format!("\"{}\",\"{}\"\n", escape_csv_field(timestamp), escape_csv_field(summary))
}

/// Files of one calendar day under a base output directory.
#[derive(Debug, Clone)]
pub struct DailyPartition {
    date: NaiveDate,
    dir: PathBuf,
}

impl DailyPartition {
    pub fn new(base: &Path, date: NaiveDate) -> Self {
        Self {
            date,
            dir: base.join(month_path(date)),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(format!("{:02}.csv", self.date.day()))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(self.snapshot_file_name())
    }

    /// Snapshot path relative to the base directory, `/`-separated (`YYYY/MM/DD.ctx.br`).
    pub fn relative_snapshot_path(&self) -> String {
        format!("{}/{}", month_path(self.date), self.snapshot_file_name())
    }

    fn snapshot_file_name(&self) -> String {
        format!("{:02}.ctx.br", self.date.day())
    }

    /// Create the month directory and the CSV header. Safe to call any number of times.
    ///
    /// A zero-length CSV left behind by an interrupted header write gets its header back.
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DigestError::persistence(&self.dir, e))?;

        let csv = self.csv_path();
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&csv)
            .await
        {
            Ok(mut f) => {
                f.write_all(CSV_HEADER.as_bytes())
                    .await
                    .map_err(|e| DigestError::persistence(&csv, e))?;
                f.flush().await.map_err(|e| DigestError::persistence(&csv, e))?;
                tracing::info!(path = %csv.display(), "created daily csv");
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let len = tokio::fs::metadata(&csv)
                    .await
                    .map_err(|e| DigestError::persistence(&csv, e))?
                    .len();
                if len == 0 {
                    tracing::warn!(path = %csv.display(), "empty daily csv, rewriting header");
                    tokio::fs::write(&csv, CSV_HEADER)
                        .await
                        .map_err(|e| DigestError::persistence(&csv, e))?;
                }
            }
            Err(e) => return Err(DigestError::persistence(&csv, e).into()),
        }
        Ok(())
    }

    /// Append one summary row. Existing bytes are never rewritten.
    pub async fn append_row(&self, timestamp: &str, summary: &str) -> Result<()> {
        self.ensure().await?;
        let csv = self.csv_path();
        let mut f = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&csv)
            .await
            .map_err(|e| DigestError::persistence(&csv, e))?;
        f.write_all(format_row(timestamp, summary).as_bytes())
            .await
            .map_err(|e| DigestError::persistence(&csv, e))?;
        f.flush().await.map_err(|e| DigestError::persistence(&csv, e))?;
        Ok(())
    }

    /// Replace the day's snapshot. Written to a temp file first, then renamed over the old one.
    pub async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_vec(snapshot).context("serializing snapshot")?;
        let compressed = tokio::task::spawn_blocking(move || compress(&json))
            .await
            .context("compression task")?
            .context("brotli compression")?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DigestError::persistence(&self.dir, e))?;
        let path = self.snapshot_path();
        let tmp = path.with_extension("br.tmp");
        tokio::fs::write(&tmp, &compressed)
            .await
            .map_err(|e| DigestError::persistence(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DigestError::persistence(&path, e))?;
        Ok(())
    }

    /// `Ok(None)` when the day has no snapshot yet.
    pub async fn read_snapshot(&self) -> Result<Option<Snapshot>> {
        let path = self.snapshot_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("reading {}", path.display())))
            }
        };
        let snapshot_err = |reason: String| DigestError::Snapshot {
            path: path.clone(),
            reason,
        };
        let json = decompress(&bytes).map_err(|e| snapshot_err(format!("brotli: {e}")))?;
        let snap: Snapshot =
            serde_json::from_slice(&json).map_err(|e| snapshot_err(format!("json: {e}")))?;
        Ok(Some(snap))
    }
}

fn month_path(date: NaiveDate) -> String {
    format!("{:04}/{:02}", date.year(), date.month())
}

fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut w = brotli::CompressorWriter::new(Vec::new(), BROTLI_BUFFER, BROTLI_QUALITY, BROTLI_LGWIN);
    w.write_all(data)?;
    w.flush()?;
    Ok(w.into_inner())
}

fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    brotli::Decompressor::new(data, BROTLI_BUFFER).read_to_end(&mut out)?;
    Ok(out)
}
