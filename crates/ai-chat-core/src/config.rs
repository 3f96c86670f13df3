use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const CONFIG_FILE_PATH: &str = "config.toml";

/// Connection settings for a chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    #[serde(default, alias = "base_url")]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, alias = "api_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, alias = "max_tokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_ms", alias = "timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn ai_chat_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".ai-chat")
}

fn ai_chat_config_json_path() -> PathBuf {
    ai_chat_dir().join("config.json")
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: String::new(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ChatConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Load from `~/.ai-chat/config.json`, falling back to `./config.toml`, then apply
    /// `AI_CHAT_*` environment overrides.
    ///
    /// The result is not validated; callers decide whether missing fields are fatal.
    pub fn load() -> Self {
        let mut config = Self::from_json_file(&ai_chat_config_json_path())
            .or_else(|| Self::from_toml_file(Path::new(CONFIG_FILE_PATH)))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn from_json_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<ChatConfig>(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn from_toml_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<ChatConfig>(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Apply `AI_CHAT_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("AI_CHAT_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(model) = lookup("AI_CHAT_MODEL") {
            self.model = model;
        }
        if let Some(api_key) = lookup("AI_CHAT_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(value) = lookup("AI_CHAT_TEMPERATURE") {
            match value.trim().parse::<f32>() {
                Ok(temperature) => self.temperature = Some(temperature),
                Err(_) => log::warn!("Ignoring AI_CHAT_TEMPERATURE={:?}", value),
            }
        }
        if let Some(value) = lookup("AI_CHAT_MAX_TOKENS") {
            match value.trim().parse::<u32>() {
                Ok(max_tokens) => self.max_tokens = Some(max_tokens),
                Err(_) => log::warn!("Ignoring AI_CHAT_MAX_TOKENS={:?}", value),
            }
        }
        if let Some(value) = lookup("AI_CHAT_TIMEOUT_MS") {
            match value.trim().parse::<u64>() {
                Ok(timeout_ms) => self.timeout_ms = timeout_ms,
                Err(_) => log::warn!("Ignoring AI_CHAT_TIMEOUT_MS={:?}", value),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ChatError::InvalidConfig("baseUrl is required".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ChatError::InvalidConfig("model is required".to_string()));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ChatError::InvalidConfig(format!(
                    "temperature must be between 0 and 2, got {temperature}"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(ChatError::InvalidConfig(
                "maxTokens must be greater than 0".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ChatError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn validate_requires_base_url_and_model() {
        let error = ChatConfig::new("", "gpt-4o").validate().unwrap_err();
        assert_eq!(error.code(), "INVALID_CONFIG");

        let error = ChatConfig::new("http://localhost", "  ").validate().unwrap_err();
        assert_eq!(error.code(), "INVALID_CONFIG");

        assert!(ChatConfig::new("http://localhost", "gpt-4o").validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let config = ChatConfig::new("http://localhost", "m").with_temperature(2.5);
        assert!(config.validate().is_err());

        let config = ChatConfig::new("http://localhost", "m").with_temperature(2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let config = ChatConfig::new("http://localhost", "m").with_max_tokens(0);
        assert!(config.validate().is_err());

        let config = ChatConfig::new("http://localhost", "m").with_timeout_ms(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        assert_eq!(ChatConfig::default().timeout_ms, 30_000);
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let vars = env(&[
            ("AI_CHAT_BASE_URL", "http://example.test/v1"),
            ("AI_CHAT_MODEL", "kimi"),
            ("AI_CHAT_API_KEY", "sk-test"),
            ("AI_CHAT_TEMPERATURE", "0.3"),
            ("AI_CHAT_MAX_TOKENS", "not-a-number"),
        ]);

        let mut config = ChatConfig::default();
        config.apply_env(|key| vars.get(key).cloned());

        assert_eq!(config.base_url, "http://example.test/v1");
        assert_eq!(config.model, "kimi");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.max_tokens, None);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn reads_camel_case_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"baseUrl":"http://localhost:8080","model":"gpt-4o","maxTokens":512,"timeout":1000}}"#
        )
        .expect("write");

        let config = ChatConfig::from_json_file(file.path()).expect("config");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.timeout_ms, 1000);
    }

    #[test]
    fn reads_snake_case_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "base_url = \"http://localhost:9000\"").expect("write");
        writeln!(file, "model = \"llama3\"").expect("write");

        let config = ChatConfig::from_toml_file(file.path()).expect("config");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{not json").expect("write");
        assert!(ChatConfig::from_json_file(file.path()).is_none());
    }
}
