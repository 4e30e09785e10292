// src/ingest/registry.rs
//! Declarative source table. Iteration order is the section order of every cycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::ingest::providers::{calendar, health, imessage, mail, meetings, news, screentime, weather};
use crate::ingest::types::SourceFetcher;

pub type BuildFn = fn(&AppConfig, &reqwest::Client) -> Arc<dyn SourceFetcher>;

pub struct SourceEntry {
    pub name: &'static str,
    pub enabled: fn(&AppConfig) -> bool,
    pub build: BuildFn,
}

fn always(_: &AppConfig) -> bool {
    true
}
fn health_on(c: &AppConfig) -> bool {
    c.sources.health
}
fn transcripts_on(c: &AppConfig) -> bool {
    c.sources.transcripts
}
fn screen_time_on(c: &AppConfig) -> bool {
    c.sources.screen_time
}
fn mail_on(c: &AppConfig) -> bool {
    c.sources.mail
}
fn calendar_on(c: &AppConfig) -> bool {
    c.sources.calendar
}
fn imessage_on(c: &AppConfig) -> bool {
    c.sources.imessage
}

pub static SOURCES: [SourceEntry; 8] = [
    SourceEntry {
        name: health::NAME,
        enabled: health_on,
        build: health::build,
    },
    SourceEntry {
        name: meetings::NAME,
        enabled: transcripts_on,
        build: meetings::build,
    },
    SourceEntry {
        name: weather::NAME,
        enabled: always,
        build: weather::build,
    },
    SourceEntry {
        name: news::NAME,
        enabled: always,
        build: news::build,
    },
    SourceEntry {
        name: screentime::NAME,
        enabled: screen_time_on,
        build: screentime::build,
    },
    SourceEntry {
        name: mail::NAME,
        enabled: mail_on,
        build: mail::build,
    },
    SourceEntry {
        name: calendar::NAME,
        enabled: calendar_on,
        build: calendar::build,
    },
    SourceEntry {
        name: imessage::NAME,
        enabled: imessage_on,
        build: imessage::build,
    },
];

/// Names of the sources that would run under `config`, in table order.
pub fn enabled_names(config: &AppConfig) -> Vec<&'static str> {
    SOURCES
        .iter()
        .filter(|e| (e.enabled)(config))
        .map(|e| e.name)
        .collect()
}

/// Build the fetchers for every enabled source, in table order.
pub fn build_enabled(config: &AppConfig, http: &reqwest::Client) -> Vec<Arc<dyn SourceFetcher>> {
    SOURCES
        .iter()
        .filter(|e| (e.enabled)(config))
        .map(|e| (e.build)(config, http))
        .collect()
}

/// Shared HTTP client for the remote adapters.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("personal-digest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
        .context("building http client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_runs_always_on_sources_plus_calendar() {
        let cfg = AppConfig::default();
        assert_eq!(enabled_names(&cfg), vec!["weather", "news", "calendar"]);
    }

    #[test]
    fn toggles_insert_sources_at_fixed_positions() {
        let mut cfg = AppConfig::default();
        cfg.sources.imessage = true;
        cfg.sources.health = true;
        cfg.sources.calendar = false;
        assert_eq!(
            enabled_names(&cfg),
            vec!["health", "weather", "news", "imessage"]
        );
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<_> = SOURCES.iter().map(|e| e.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SOURCES.len());
    }
}
