// src/config/llm.rs
use serde::{Deserialize, Serialize};

use crate::error::DigestError;

fn default_model() -> String {
    "gemini-2.5-pro-preview-03-25".to_string()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Gemini model identifier, opaque to the core.
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GEMINI_API_KEY.
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the Generative Language REST API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Resolve an `"ENV"` placeholder through `lookup` and check a key is present.
    pub fn resolve_key(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<(), DigestError> {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = lookup("GEMINI_API_KEY").unwrap_or_default();
        }
        self.api_key = self.api_key.trim().to_string();
        if self.api_key.is_empty() {
            return Err(DigestError::Config(
                "GEMINI_API_KEY environment variable is not set".into(),
            ));
        }
        Ok(())
    }

    /// Safe for logs: never prints the key itself.
    pub fn describe(&self) -> String {
        format!("model={}, key_len={}", self.model, self.api_key.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_placeholder_is_resolved() {
        let mut cfg = LlmConfig {
            api_key: "ENV".into(),
            ..LlmConfig::default()
        };
        cfg.resolve_key(&|k: &str| (k == "GEMINI_API_KEY").then(|| " secret ".to_string()))
            .unwrap();
        assert_eq!(cfg.api_key, "secret");
        assert!(!cfg.describe().contains("secret"));
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let mut cfg = LlmConfig::default();
        let err = cfg.resolve_key(&|_: &str| None).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
