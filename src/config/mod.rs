// src/config/mod.rs
pub mod llm;

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DigestError;
pub use llm::LlmConfig;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";

const DEFAULT_PROMPT: &str = "\
You are a helpful assistant writing a light-hearted brief, the time now is {time}.
- Use **Markdown**.
- Convert each news, Reddit or Hacker News headline in the context into \"[title](link)\" markdown.
- Bullet-points welcome; keep it short; avoid negativity unless it's a joke.
- Mention weather only if it will materially affect plans today.
- Write the facts in an informative but engaging way; do not repeat duplicates from the context.
- News is the least important thing, so put it last.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        // London
        Self {
            latitude: 51.503,
            longitude: -0.1276,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub rss_feeds: Vec<String>,
    pub include_hacker_news: bool,
    pub subreddits: Vec<String>,
    pub num_top_posts: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            rss_feeds: vec!["https://feeds.bbci.co.uk/news/rss.xml?edition=uk".into()],
            include_hacker_news: true,
            subreddits: vec![
                "worldnews".into(),
                "technology".into(),
                "science".into(),
                "UpliftingNews".into(),
            ],
            num_top_posts: 7,
        }
    }
}

/// Opt-in source toggles. Weather and news are always on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceToggles {
    pub health: bool,
    pub transcripts: bool,
    pub screen_time: bool,
    pub mail: bool,
    pub calendar: bool,
    pub imessage: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            health: false,
            transcripts: false,
            screen_time: false,
            mail: false,
            calendar: true,
            imessage: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePaths {
    pub health_data_dir: Option<PathBuf>,
    pub transcripts_db: Option<PathBuf>,
    pub screen_time_db: Option<PathBuf>,
    pub imessage_db: Option<PathBuf>,
}

/// Immutable snapshot of everything a cycle needs. Shared as `Arc<AppConfig>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub interval_minutes: u64,
    /// Base prompt; `{time}` is replaced with the cycle's local HH:MM.
    pub prompt: String,
    pub output_dir: PathBuf,
    pub web_content_dir: PathBuf,
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub news: NewsConfig,
    pub sources: SourceToggles,
    pub paths: SourcePaths,
    pub imessage_chats: Vec<String>,
    pub shutdown_grace_ms: u64,
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
            prompt: DEFAULT_PROMPT.to_string(),
            output_dir: PathBuf::from("./data"),
            web_content_dir: PathBuf::from("./web/src/content/summaries"),
            llm: LlmConfig::default(),
            weather: WeatherConfig::default(),
            news: NewsConfig::default(),
            sources: SourceToggles::default(),
            paths: SourcePaths::default(),
            imessage_chats: Vec::new(),
            shutdown_grace_ms: 1_000,
            metrics_addr: None,
        }
    }
}

impl AppConfig {
    /// Load config using `.env`, then file + env var fallbacks:
    /// 1) `explicit` path (CLI)
    /// 2) $DIGEST_CONFIG_PATH
    /// 3) config/digest.toml
    /// 4) built-in defaults
    ///
    /// Environment overrides are applied last, then the result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let lookup = |k: &str| std::env::var(k).ok();
        let mut cfg = match config_file_path(explicit, &lookup)? {
            Some(p) => {
                info!(path = %p.display(), "loading config file");
                Self::from_toml_path(&p)?
            }
            None => Self::default(),
        };
        cfg.apply_env(&lookup)?;
        cfg.validate(&lookup)?;
        Ok(cfg)
    }

    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| anyhow::Error::new(DigestError::Config(e.to_string())))
            .context("parsing config toml")
    }

    /// Overlay recognised environment variables onto the current values.
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("INTERVAL_MINUTES") {
            self.interval_minutes = parse_env("INTERVAL_MINUTES", &v)?;
        }
        if let Some(v) = lookup("LLM_PROMPT") {
            self.prompt = v;
        }
        if let Some(v) = lookup("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("WEB_CONTENT_DIR") {
            self.web_content_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("GEMINI_MODEL_NAME") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("GEMINI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = lookup("GEMINI_API_URL") {
            self.llm.endpoint = v;
        }
        if let Some(v) = lookup("LATITUDE") {
            self.weather.latitude = parse_env("LATITUDE", &v)?;
        }
        if let Some(v) = lookup("LONGITUDE") {
            self.weather.longitude = parse_env("LONGITUDE", &v)?;
        }
        if let Some(v) = lookup("HEALTH_DATA_DIR").or_else(|| lookup("HEALTH_DATA_PATH")) {
            self.paths.health_data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("TRANSCRIPTS_DB_PATH") {
            self.paths.transcripts_db = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SCREEN_TIME_DB_PATH") {
            self.paths.screen_time_db = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("IMESSAGE_DB_PATH") {
            self.paths.imessage_db = Some(PathBuf::from(v));
        } else if self.paths.imessage_db.is_none() {
            if let Some(home) = lookup("HOME") {
                self.paths.imessage_db = Some(Path::new(&home).join("Library/Messages/chat.db"));
            }
        }
        let toggles = [
            ("ENABLE_HEALTH", &mut self.sources.health),
            ("ENABLE_TRANSCRIPTS", &mut self.sources.transcripts),
            ("ENABLE_SCREEN_TIME", &mut self.sources.screen_time),
            ("ENABLE_MAIL", &mut self.sources.mail),
            ("ENABLE_CALENDAR", &mut self.sources.calendar),
            ("ENABLE_IMESSAGE", &mut self.sources.imessage),
        ];
        for (key, slot) in toggles {
            if let Some(v) = lookup(key) {
                *slot = parse_flag(&v);
            }
        }
        if let Some(v) = lookup("METRICS_ADDR") {
            self.metrics_addr = Some(parse_env("METRICS_ADDR", &v)?);
        }
        Ok(())
    }

    /// Refuse half-configured states. Missing files behind configured paths only warn.
    pub fn validate(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if self.interval_minutes == 0 {
            return Err(DigestError::Config("interval_minutes must be positive".into()).into());
        }
        let mock_llm = lookup("LLM_TEST_MODE").is_some_and(|v| v == "mock");
        if !mock_llm {
            self.llm.resolve_key(lookup)?;
        }

        let required = [
            ("health", self.sources.health, &self.paths.health_data_dir),
            ("transcripts", self.sources.transcripts, &self.paths.transcripts_db),
            ("screen_time", self.sources.screen_time, &self.paths.screen_time_db),
            ("imessage", self.sources.imessage, &self.paths.imessage_db),
        ];
        for (name, enabled, path) in required {
            if !enabled {
                continue;
            }
            match path {
                None => {
                    return Err(DigestError::Config(format!(
                        "source `{name}` is enabled but has no path configured"
                    ))
                    .into())
                }
                Some(p) if !p.exists() => {
                    warn!(source = name, path = %p.display(), "configured path not found");
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Names of the opt-in sources currently switched on, for startup logs.
    pub fn enabled_optional_sources(&self) -> Vec<&'static str> {
        let s = &self.sources;
        [
            (s.health, "health"),
            (s.transcripts, "meetings"),
            (s.screen_time, "screen_time"),
            (s.mail, "mail"),
            (s.calendar, "calendar"),
            (s.imessage, "imessage"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_minutes * 60)
    }
}

fn config_file_path(
    explicit: Option<&Path>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        return Ok(Some(p.to_path_buf()));
    }
    if let Some(p) = lookup(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(DigestError::Config(format!(
            "{ENV_CONFIG_PATH} points to non-existent path {}",
            pb.display()
        ))
        .into());
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(default.exists().then_some(default))
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::Error::new(DigestError::Config(format!("invalid {key}={raw:?}: {e}"))))
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
