//! Static configuration and credential resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_PROMPT_TYPE: &str = "general";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Model and generation settings (the `api` section of the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_prompt_type")]
    pub default_prompt_type: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_prompt_type() -> String {
    DEFAULT_PROMPT_TYPE.into()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            default_prompt_type: DEFAULT_PROMPT_TYPE.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

/// Top-level ChatRelay configuration (persisted as JSON).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRelayConfig {
    #[serde(default)]
    pub api: ApiConfig,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl ChatRelayConfig {
    /// Load config from file, falling back to defaults.
    ///
    /// A missing or unparsable file yields the defaults. `CHATRELAY_MODEL`
    /// overrides the model name when set.
    pub fn load(config_path: &Path) -> Self {
        let mut config: ChatRelayConfig = match std::fs::read_to_string(config_path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                debug!("Ignoring invalid config {}: {}", config_path.display(), e);
                ChatRelayConfig::default()
            }),
            Err(_) => ChatRelayConfig::default(),
        };

        config.config_path = config_path.to_path_buf();

        if let Ok(model) = std::env::var("CHATRELAY_MODEL") {
            if !model.trim().is_empty() {
                config.api.default_model = model;
            }
        }

        config
    }

    /// Parse config from a JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ChatRelayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved config to {}", self.config_path.display());
        Ok(())
    }

    /// Reject settings the API would refuse outright.
    pub fn validate(&self) -> Result<()> {
        if self.api.default_model.trim().is_empty() {
            return Err(Error::Config("api.defaultModel must not be empty".into()));
        }
        if self.api.max_tokens == 0 {
            return Err(Error::Config("api.maxTokens must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.api.temperature) {
            return Err(Error::Config(format!(
                "api.temperature {} outside [0, 2]",
                self.api.temperature
            )));
        }
        Ok(())
    }
}

/// Resolve the API key: explicit value first, then the environment.
pub fn resolve_api_key(explicit: Option<String>) -> Option<String> {
    resolve_api_key_with(explicit, |name| std::env::var(name).ok())
}

fn resolve_api_key_with(
    explicit: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            API_KEY_ENV_VARS
                .iter()
                .filter_map(|name| lookup(name))
                .find(|k| !k.trim().is_empty())
        })
}
