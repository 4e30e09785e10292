// src/markdown.rs
//! One markdown file per cycle for the static site: `<root>/<YYYY>/<MM>/<DD>-<N>.md`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tokio::io::AsyncWriteExt;

use crate::error::DigestError;

#[derive(Debug, Clone)]
pub struct MarkdownWriter {
    root: PathBuf,
}

impl MarkdownWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn month_dir(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
    }

    pub fn file_path(&self, date: NaiveDate, index: u32) -> PathBuf {
        self.month_dir(date)
            .join(format!("{:02}-{index}.md", date.day()))
    }

    /// Number of `<DD>-*.md` files already written for `date`, plus one.
    ///
    /// When that index is taken (a page of the day went missing), the next index above the
    /// highest existing one is used instead, so the sequence keeps increasing.
    pub async fn next_index(&self, date: NaiveDate) -> Result<u32> {
        let dir = self.month_dir(date);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DigestError::persistence(&dir, e))?;

        let prefix = format!("{:02}-", date.day());
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| DigestError::persistence(&dir, e))?;
        let mut count = 0u32;
        let mut taken = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DigestError::persistence(&dir, e))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(".md"))
            else {
                continue;
            };
            count += 1;
            if let Ok(n) = stem.parse::<u32>() {
                taken.push(n);
            }
        }

        let next = count + 1;
        if taken.contains(&next) {
            let highest = taken.iter().copied().max().unwrap_or(0);
            tracing::warn!(dir = %dir.display(), next, highest, "markdown sequence has a gap");
            return Ok(highest + 1);
        }
        Ok(next)
    }

    /// Write the artifact for cycle `index` of `at`'s day. Fails rather than overwrite.
    pub async fn write(
        &self,
        at: NaiveDateTime,
        index: u32,
        context_file: &str,
        body: &str,
    ) -> Result<PathBuf> {
        let date = at.date();
        let dir = self.month_dir(date);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DigestError::persistence(&dir, e))?;

        let path = self.file_path(date, index);
        let doc = render(at, index, context_file, body);
        let mut f = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    tracing::error!(path = %path.display(), "markdown artifact already exists");
                }
                DigestError::persistence(&path, e)
            })?;
        f.write_all(doc.as_bytes())
            .await
            .map_err(|e| DigestError::persistence(&path, e))?;
        f.flush().await.map_err(|e| DigestError::persistence(&path, e))?;
        Ok(path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// YAML front-matter followed by the body verbatim. Strings are emitted as JSON literals,
/// which YAML reads back unchanged.
fn render(at: NaiveDateTime, index: u32, context_file: &str, body: &str) -> String {
    let quote = |s: &str| serde_json::Value::String(s.to_string()).to_string();
    let title = format!("{} #{index}", at.format("%Y-%m-%d"));
    format!(
        "---\ndate: {}\nindex: {index}\ntitle: {}\ncontextFile: {}\n---\n\n{body}\n",
        quote(&at.format("%Y-%m-%dT%H:%M:%S").to_string()),
        quote(&title),
        quote(context_file),
    )
}
