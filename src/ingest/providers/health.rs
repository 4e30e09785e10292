// src/ingest/providers/health.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::ingest::types::SourceFetcher;

pub const NAME: &str = "health";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthRecord {
    #[allow(dead_code)]
    date: String,
    steps: Option<f64>,
    calories: Option<f64>,
    heart_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HealthExport {
    One(HealthRecord),
    Many(Vec<HealthRecord>),
}

/// Reads the Health Auto Export JSON written for the current day.
pub struct HealthFetcher {
    dir: Option<PathBuf>,
}

pub fn build(cfg: &AppConfig, _http: &reqwest::Client) -> Arc<dyn SourceFetcher> {
    Arc::new(HealthFetcher::new(cfg.paths.health_data_dir.clone()))
}

impl HealthFetcher {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn export_path(&self, day: NaiveDate) -> Option<PathBuf> {
        let file = format!("HealthAutoExport-{}.json", day.format("%Y-%m-%d"));
        self.dir.as_ref().map(|d| d.join(file))
    }

    pub async fn fetch_for(&self, day: NaiveDate) -> String {
        let Some(path) = self.export_path(day) else {
            tracing::debug!("health data dir not configured");
            return String::new();
        };
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "health export unreadable");
                return String::new();
            }
        };
        match serde_json::from_str::<HealthExport>(&raw) {
            Ok(export) => render(export),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "health export failed validation");
                String::new()
            }
        }
    }
}

fn render(export: HealthExport) -> String {
    let latest = match export {
        HealthExport::One(r) => Some(r),
        HealthExport::Many(v) => v.into_iter().last(),
    };
    let Some(r) = latest else {
        return String::new();
    };
    let parts: Vec<String> = [
        ("steps", r.steps),
        ("calories", r.calories),
        ("heartRate", r.heart_rate),
    ]
    .into_iter()
    .filter_map(|(k, v)| v.map(|v| format!("{k}: {v}")))
    .collect();

    if parts.is_empty() {
        String::new()
    } else {
        format!("Health Data: {}", parts.join(", "))
    }
}

#[async_trait]
impl SourceFetcher for HealthFetcher {
    async fn fetch(&self) -> Result<String> {
        Ok(self.fetch_for(Local::now().date_naive()).await)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latest_record_of_array_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        std::fs::write(
            dir.path().join("HealthAutoExport-2025-03-09.json"),
            r#"[{"date":"2025-03-09","steps":1200},{"date":"2025-03-09","steps":8042,"heartRate":61}]"#,
        )
        .unwrap();

        let f = HealthFetcher::new(Some(dir.path().to_path_buf()));
        assert_eq!(f.fetch_for(day).await, "Health Data: steps: 8042, heartRate: 61");
    }

    #[tokio::test]
    async fn missing_or_malformed_export_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let f = HealthFetcher::new(Some(dir.path().to_path_buf()));
        assert_eq!(f.fetch_for(day).await, "");

        std::fs::write(dir.path().join("HealthAutoExport-2025-03-10.json"), "{not json").unwrap();
        assert_eq!(f.fetch_for(day).await, "");
    }
}
