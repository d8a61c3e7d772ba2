//! Configuration management with XDG paths
//!
//! ~/.config/hookchat/config.json - webhook endpoints (0600)
//! ~/.local/state/hookchat/logs/  - diagnostic log
//!
//! Credentials never land here; they live only in the in-memory
//! credential store for the lifetime of one run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "hookchat";

pub const ENV_CHAT_URL: &str = "HOOKCHAT_CHAT_URL";
pub const ENV_REFRESH_URL: &str = "HOOKCHAT_REFRESH_URL";
pub const ENV_VERIFY_URL: &str = "HOOKCHAT_VERIFY_URL";

/// Get config directory (~/.config/hookchat/)
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .context("Could not determine config directory")?;
    Ok(base.join(APP_NAME))
}

/// Get state directory (~/.local/state/hookchat/)
pub fn state_dir() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .context("Could not determine state directory")?;
    Ok(base.join(APP_NAME))
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Webhook endpoints handed to the client at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub chat_url: String,
    pub verify_url: String,
    pub refresh_url: Option<String>,
}

impl Endpoints {
    /// Verification probes the chat webhook unless told otherwise
    pub fn new(chat_url: impl Into<String>) -> Self {
        let chat_url = chat_url.into();
        Self {
            verify_url: chat_url.clone(),
            chat_url,
            refresh_url: None,
        }
    }

    pub fn with_refresh(mut self, url: impl Into<String>) -> Self {
        self.refresh_url = Some(url.into());
        self
    }

    pub fn with_verify(mut self, url: impl Into<String>) -> Self {
        self.verify_url = url.into();
        self
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Chat webhook URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_url: Option<String>,

    /// Knowledgebase refresh webhook URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Login probe URL (defaults to chat_url)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_url: Option<String>,
}

impl Config {
    /// Load config from the default path, with environment overrides applied
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_from(&config_path()?)?;
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Load config from disk, or return defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save config with secure permissions
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, &content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;

        Ok(())
    }

    /// Environment variables take precedence over file values
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(ENV_CHAT_URL) {
            self.chat_url = Some(v);
        }
        if let Some(v) = non_empty(ENV_REFRESH_URL) {
            self.refresh_url = Some(v);
        }
        if let Some(v) = non_empty(ENV_VERIFY_URL) {
            self.verify_url = Some(v);
        }
    }

    /// Set a value by its CLI key name
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match key {
            "chat_url" | "chat" => self.chat_url = value,
            "refresh_url" | "refresh" => self.refresh_url = value,
            "verify_url" | "verify" => self.verify_url = value,
            _ => anyhow::bail!(
                "Unknown config key: {}. Valid keys: chat_url, refresh_url, verify_url",
                key
            ),
        }
        Ok(())
    }

    /// Resolve the endpoints the client talks to
    pub fn endpoints(&self) -> Result<Endpoints> {
        let chat_url = self.chat_url.clone().with_context(|| {
            format!(
                "No chat URL configured. Set {} or run: hookchat config set chat_url <url>",
                ENV_CHAT_URL
            )
        })?;

        let mut endpoints = Endpoints::new(chat_url);
        if let Some(url) = &self.verify_url {
            endpoints = endpoints.with_verify(url.clone());
        }
        if let Some(url) = &self.refresh_url {
            endpoints = endpoints.with_refresh(url.clone());
        }
        Ok(endpoints)
    }
}
