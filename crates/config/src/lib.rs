//! Configuration loading, validation, and management for ChatWithYou.
//!
//! Loads configuration from `~/.chatwithyou/config.toml` (or the path in
//! `CHATWITHYOU_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Sampling parameters sent with every completion
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Conversation context window
    #[serde(default)]
    pub context: ContextConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion providers, tried primary-first
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

fn default_temperature() -> f32 {
    0.8
}
fn default_max_tokens() -> u32 {
    300
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Turns kept per conversation before the oldest is evicted.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Turns rendered into the prompt transcript.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Conversations cached before the least recently used is dropped.
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
}

fn default_max_turns() -> usize {
    10
}
fn default_history_window() -> usize {
    6
}
fn default_max_conversations() -> usize {
    1_000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            history_window: default_history_window(),
            max_conversations: default_max_conversations(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer tokens accepted on `/v1`; empty leaves the API open.
    #[serde(default)]
    pub api_tokens: Vec<String>,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,

    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    4000
}
fn default_rate_limit() -> usize {
    60
}
fn default_max_message_chars() -> usize {
    1_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_tokens: Vec::new(),
            rate_limit_per_minute: default_rate_limit(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_tokens", &format!("[{} REDACTED]", self.api_tokens.len()))
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("max_message_chars", &self.max_message_chars)
            .finish()
    }
}

/// Wire protocol spoken by a provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `POST {api_url}/chat/completions`
    #[serde(rename = "openai")]
    OpenAi,
    /// `POST {api_url}/v1/messages`
    Anthropic,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,

    #[serde(default = "default_kind")]
    pub kind: ProviderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub model: String,

    #[serde(default)]
    pub primary: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_kind() -> ProviderKind {
    ProviderKind::OpenAi
}
fn default_timeout_secs() -> u64 {
    30
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("primary", &self.primary)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig {
        name: "openai".into(),
        kind: ProviderKind::OpenAi,
        api_url: None,
        api_key: None,
        model: "gpt-4o-mini".into(),
        primary: true,
        timeout_secs: default_timeout_secs(),
    }]
}

const QINIU_DEFAULT_URL: &str = "https://api.qnaigc.com/v1";
const QINIU_DEFAULT_MODEL: &str = "deepseek-v3";

impl AppConfig {
    /// Load configuration from the default path, then apply environment
    /// overrides:
    /// - `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL` (provider `openai`)
    /// - `QINIU_API_KEY`, `QINIU_BASE_URL`, `QINIU_MODEL_ID` (provider `qiniu`)
    /// - `CHATWITHYOU_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_key = var("OPENAI_API_KEY");
        let openai_url = var("OPENAI_BASE_URL");
        let openai_model = var("OPENAI_MODEL");
        if openai_key.is_some() || openai_url.is_some() || openai_model.is_some() {
            let has_primary = self.providers.iter().any(|p| p.primary);
            let entry = self.provider_entry("openai", "gpt-4o-mini", !has_primary);
            if let Some(key) = openai_key {
                entry.api_key = Some(key);
            }
            if let Some(url) = openai_url {
                entry.api_url = Some(url);
            }
            if let Some(model) = openai_model {
                entry.model = model;
            }
        }

        if let Some(key) = var("QINIU_API_KEY") {
            let entry = self.provider_entry("qiniu", QINIU_DEFAULT_MODEL, false);
            entry.api_key = Some(key);
            let url = var("QINIU_BASE_URL")
                .or_else(|| entry.api_url.clone())
                .unwrap_or_else(|| QINIU_DEFAULT_URL.into());
            entry.api_url = Some(url);
            if let Some(model) = var("QINIU_MODEL_ID") {
                entry.model = model;
            }
        }

        if let Some(port) = var("CHATWITHYOU_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid CHATWITHYOU_PORT"),
            }
        }
    }

    /// Find the provider named `name`, appending an OpenAI-compatible entry if absent.
    fn provider_entry(&mut self, name: &str, model: &str, primary: bool) -> &mut ProviderConfig {
        let idx = match self.providers.iter().position(|p| p.name == name) {
            Some(idx) => idx,
            None => {
                self.providers.push(ProviderConfig {
                    name: name.into(),
                    kind: ProviderKind::OpenAi,
                    api_url: None,
                    api_key: None,
                    model: model.into(),
                    primary,
                    timeout_secs: default_timeout_secs(),
                });
                self.providers.len() - 1
            }
        };
        &mut self.providers[idx]
    }

    /// Path of the config file, honouring `CHATWITHYOU_CONFIG`.
    pub fn config_path() -> PathBuf {
        std::env::var("CHATWITHYOU_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"))
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatwithyou")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generation;
        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if g.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_tokens must be > 0".into(),
            ));
        }

        let c = &self.context;
        if c.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_turns must be > 0".into(),
            ));
        }
        if c.history_window > c.max_turns {
            return Err(ConfigError::ValidationError(format!(
                "context.history_window ({}) cannot exceed context.max_turns ({})",
                c.history_window, c.max_turns
            )));
        }
        if c.max_conversations == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_conversations must be > 0".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for p in &self.providers {
            if p.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "provider '{}' has an empty model",
                    p.name
                )));
            }
            if !seen.insert(p.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate provider name '{}'",
                    p.name
                )));
            }
        }

        Ok(())
    }

    /// Providers that have an API key and can actually be called.
    pub fn usable_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            context: ContextConfig::default(),
            server: ServerConfig::default(),
            providers: default_providers(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for chatwithyou_core::Error {
    fn from(e: ConfigError) -> Self {
        chatwithyou_core::Error::Config {
            message: e.to_string(),
        }
    }
}
