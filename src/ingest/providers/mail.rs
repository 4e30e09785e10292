// src/ingest/providers/mail.rs
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::apple::run_applescript;
use crate::config::AppConfig;
use crate::ingest::types::SourceFetcher;

pub const NAME: &str = "mail";

const SUBJECT_DELIM: &str = " || ";
const RESULT_DELIM: &str = "##";

const SCRIPT: &str = r###"
tell application "Mail"
  set unreadCount to unread count of inbox
  set recentSubs to ""
  try
    set recentMessages to items 1 thru 5 of (get messages of inbox)
    repeat with m in recentMessages
      set recentSubs to recentSubs & (subject of m) & " || "
    end repeat
  end try
  return (unreadCount as string) & "##" & recentSubs
end tell
"###;

/// Unread count and recent subjects from Mail.app (needs Automation permission).
pub struct MailFetcher;

pub fn build(_cfg: &AppConfig, _http: &reqwest::Client) -> Arc<dyn SourceFetcher> {
    Arc::new(MailFetcher)
}

/// Parse `"<unread>##<subject> || <subject> || "`.
fn render(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    let (unread, subjects) = raw.split_once(RESULT_DELIM).unwrap_or((raw, ""));
    let Ok(unread) = unread.trim().parse::<u64>() else {
        tracing::warn!(output = raw, "unexpected Mail.app output");
        return String::new();
    };
    let subjects = subjects.trim().trim_end_matches(SUBJECT_DELIM.trim()).trim();
    if subjects.is_empty() {
        format!("Mail: {unread} unread")
    } else {
        format!("Mail: {unread} unread. Recent subjects: {subjects}")
    }
}

#[async_trait]
impl SourceFetcher for MailFetcher {
    async fn fetch(&self) -> Result<String> {
        match run_applescript(SCRIPT).await {
            Ok(raw) => Ok(render(&raw)),
            Err(e) => {
                tracing::warn!(error = ?e, "mail fetch failed (check Automation permissions)");
                Ok(String::new())
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
