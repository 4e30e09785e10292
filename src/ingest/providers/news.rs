// src/ingest/providers/news.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::config::{AppConfig, NewsConfig};
use crate::ingest::types::SourceFetcher;

pub const NAME: &str = "news";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HnResponse {
    hits: Vec<HnHit>,
}

#[derive(Debug, Deserialize)]
struct HnHit {
    title: String,
    url: Option<String>,
    #[serde(rename = "objectID")]
    object_id: String,
}

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: Option<RedditData>,
}

#[derive(Debug, Deserialize)]
struct RedditData {
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    title: String,
    permalink: String,
}

/// Decode entities, strip tags, collapse whitespace.
pub fn normalize_title(s: &str) -> String {
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));

    let decoded = html_escape::decode_html_entities(s);
    let stripped = re_tags.replace_all(&decoded, "");
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

fn pub_date_utc(ts: &str) -> Option<OffsetDateTime> {
    let ts = ts.trim();
    // Many feeds still emit the obsolete "GMT"/"UT" zone names.
    let numeric = ts
        .strip_suffix(" GMT")
        .or_else(|| ts.strip_suffix(" UT"))
        .map(|head| format!("{head} +0000"));
    OffsetDateTime::parse(numeric.as_deref().unwrap_or(ts), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
}

fn link(title: &str, url: &str) -> String {
    format!("[{}]({})", normalize_title(title), url)
}

/// Markdown links for the items of `xml` published on `today` (UTC), at most `limit`.
fn parse_feed(xml: &str, feed_url: &str, today: time::Date, limit: usize) -> Result<Vec<String>> {
    let rss: Rss = from_str(xml).context("parsing rss xml")?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .filter(|it| {
            it.pub_date
                .as_deref()
                .and_then(pub_date_utc)
                .is_some_and(|d| d.date() == today)
        })
        .take(limit)
        .filter_map(|it| {
            let title = it.title?;
            Some(link(&title, it.link.as_deref().unwrap_or(feed_url)))
        })
        .collect())
}

fn render_hn(body: &str) -> Result<Vec<String>> {
    let parsed: HnResponse = serde_json::from_str(body).context("parsing hacker news json")?;
    Ok(parsed
        .hits
        .into_iter()
        .map(|h| {
            let url = h
                .url
                .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", h.object_id));
            link(&h.title, &url)
        })
        .collect())
}

fn render_reddit(body: &str) -> Result<Vec<String>> {
    let parsed: RedditListing = serde_json::from_str(body).context("parsing reddit json")?;
    Ok(parsed
        .data
        .map(|d| d.children)
        .unwrap_or_default()
        .into_iter()
        .map(|c| link(&c.data.title, &format!("https://reddit.com{}", c.data.permalink)))
        .collect())
}

fn render(rss: &[String], hn: &[String], reddit: &[String]) -> String {
    let mut sections = Vec::new();
    if !rss.is_empty() {
        sections.push(format!("RSS: {}", rss.join(" | ")));
    }
    if !hn.is_empty() {
        sections.push(format!("Hacker News: {}", hn.join(" | ")));
    }
    if !reddit.is_empty() {
        sections.push(format!("Reddit: {}", reddit.join(" | ")));
    }
    if sections.is_empty() {
        String::new()
    } else {
        format!("News: {}", sections.join(" || "))
    }
}

/// Headlines from RSS feeds, the Hacker News front page and subreddit top posts.
pub struct NewsFetcher {
    http: reqwest::Client,
    cfg: NewsConfig,
}

pub fn build(cfg: &AppConfig, http: &reqwest::Client) -> Arc<dyn SourceFetcher> {
    Arc::new(NewsFetcher {
        http: http.clone(),
        cfg: cfg.news.clone(),
    })
}

impl NewsFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.http
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} non-2xx"))?
            .text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }

    async fn rss(&self) -> Vec<String> {
        let today = OffsetDateTime::now_utc().date();
        let mut out = Vec::new();
        for feed in &self.cfg.rss_feeds {
            let parsed = match self.get_text(feed).await {
                Ok(xml) => parse_feed(&xml, feed, today, self.cfg.num_top_posts),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(mut v) => out.append(&mut v),
                Err(e) => tracing::warn!(error = ?e, feed = %feed, "rss feed skipped"),
            }
        }
        out
    }

    async fn hacker_news(&self) -> Vec<String> {
        if !self.cfg.include_hacker_news {
            return Vec::new();
        }
        let url = format!(
            "https://hn.algolia.com/api/v1/search?tags=front_page&hitsPerPage={}",
            self.cfg.num_top_posts
        );
        match self.get_text(&url).await.and_then(|b| render_hn(&b)) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, "hacker news skipped");
                Vec::new()
            }
        }
    }

    async fn reddit(&self) -> Vec<String> {
        let mut out = Vec::new();
        for sub in &self.cfg.subreddits {
            let url = format!(
                "https://www.reddit.com/r/{sub}/top.json?t=day&limit={}",
                self.cfg.num_top_posts
            );
            match self.get_text(&url).await.and_then(|b| render_reddit(&b)) {
                Ok(mut v) => out.append(&mut v),
                Err(e) => tracing::warn!(error = ?e, subreddit = %sub, "subreddit skipped"),
            }
        }
        out
    }
}

#[async_trait]
impl SourceFetcher for NewsFetcher {
    async fn fetch(&self) -> Result<String> {
        let (rss, hn, reddit) = tokio::join!(self.rss(), self.hacker_news(), self.reddit());
        Ok(render(&rss, &hn, &reddit))
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
