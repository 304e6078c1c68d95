use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::gemini::DEFAULT_MODEL;

/// Runtime configuration for the proxy.
///
/// The Gemini credential is never compiled in: it comes from the
/// `GEMINI_API_KEY` environment variable or from the config file, in that
/// order of precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub schema_version: u32,
    pub api_key: String,
    pub model: String,
    pub port: u16,
    pub history_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            port: 3000,
            history_path: None,
        }
    }
}

/// Pick the effective API key: non-empty env value wins, then the file value.
pub fn resolve_api_key(env_value: Option<&str>, file_value: &str) -> Option<String> {
    if let Some(key) = env_value {
        if !key.trim().is_empty() {
            return Some(key.trim().to_string());
        }
    }
    if !file_value.trim().is_empty() {
        return Some(file_value.trim().to_string());
    }
    None
}

impl Config {
    /// Get the default config directory
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".image-studio"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Where the prompt history lives unless overridden
    pub fn default_history_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("history.json"))
    }

    /// Load config from file or return default
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                debug!("Failed to load config, using default: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from file
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Effective API key, or `None` when neither the environment nor the
    /// config file provides one.
    pub fn resolved_api_key(&self) -> Option<String> {
        let env_value = std::env::var("GEMINI_API_KEY").ok();
        resolve_api_key(env_value.as_deref(), &self.api_key)
    }

    /// Effective history file path
    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.history_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_history_path(),
        }
    }
}
