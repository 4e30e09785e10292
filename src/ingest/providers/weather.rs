// src/ingest/providers/weather.rs
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, WeatherConfig};
use crate::ingest::types::SourceFetcher;

pub const NAME: &str = "weather";

const BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DAILY: &str = "precipitation_probability_max,temperature_2m_max,temperature_2m_min,sunset,sunshine_duration,uv_index_max,precipitation_hours,precipitation_sum,wind_speed_10m_max,wind_gusts_10m_max";
const HOURLY: &str = "temperature_2m,precipitation_probability,precipitation,rain,showers,cloud_cover,wind_speed_10m";

/// The parts of an Open-Meteo response we forward; anything else is dropped.
#[derive(Debug, Deserialize, Serialize)]
struct Forecast {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    daily: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hourly: Option<serde_json::Value>,
}

pub struct WeatherFetcher {
    http: reqwest::Client,
    coords: WeatherConfig,
}

pub fn build(cfg: &AppConfig, http: &reqwest::Client) -> Arc<dyn SourceFetcher> {
    Arc::new(WeatherFetcher {
        http: http.clone(),
        coords: cfg.weather.clone(),
    })
}

impl WeatherFetcher {
    fn url(&self) -> String {
        format!(
            "{BASE_URL}?latitude={}&longitude={}&timezone=auto&daily={DAILY}&hourly={HOURLY}",
            self.coords.latitude, self.coords.longitude
        )
    }
}

/// Validate and render a raw forecast body. Returns `None` when the payload has no forecast data.
fn render(body: &str) -> Option<String> {
    let forecast: Forecast = serde_json::from_str(body).ok()?;
    if forecast.daily.is_none() && forecast.hourly.is_none() {
        return None;
    }
    let compact = serde_json::to_string(&forecast).ok()?;
    Some(format!("Weather forecast: {compact}"))
}

#[async_trait]
impl SourceFetcher for WeatherFetcher {
    async fn fetch(&self) -> Result<String> {
        let resp = match self.http.get(self.url()).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "weather request failed");
                return Ok(String::new());
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "weather http error");
            return Ok(String::new());
        }
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "weather body unreadable");
                return Ok(String::new());
            }
        };
        Ok(render(&body).unwrap_or_else(|| {
            tracing::warn!("weather payload failed validation");
            String::new()
        }))
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
