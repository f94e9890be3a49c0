//! Retrieval settings.
//!
//! Settings are persisted to `~/.config/mailnorm/settings.json` (or the
//! platform equivalent) and loaded when the CLI starts. Missing sections and
//! zero-valued tunables fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::ConfigError;
use crate::domain::EmailService;

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Batch and attachment tunables.
    pub retrieval: RetrievalSettings,
    /// Minimum spacing between remote calls, per provider.
    pub rate_limits: RateLimitSettings,
    /// Keychain namespace holding provider secrets.
    pub keychain_service: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retrieval: RetrievalSettings::default(),
            rate_limits: RateLimitSettings::default(),
            keychain_service: "io.mailnorm.app".to_string(),
        }
    }
}

/// Batch retrieval tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Default number of emails per batch.
    pub batch_size: usize,
    /// Largest attachment, in bytes, whose content is materialized.
    pub max_attachment_size: u64,
    /// Deadline for one batch, in seconds.
    pub timeout_seconds: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_attachment_size: 1_048_576,
            timeout_seconds: 120,
        }
    }
}

/// Per-provider call spacing in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub gmail_ms: u64,
    pub outlook_ms: u64,
    pub owa_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            gmail_ms: 100,
            outlook_ms: 250,
            owa_ms: 500,
        }
    }
}

impl RateLimitSettings {
    /// Spacing for one provider.
    pub fn spacing(&self, service: EmailService) -> Duration {
        let ms = match service {
            EmailService::Gmail => self.gmail_ms,
            EmailService::Outlook => self.outlook_ms,
            EmailService::Owa => self.owa_ms,
        };
        Duration::from_millis(ms)
    }
}

impl Settings {
    /// Returns the settings file location, if a config directory exists.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "mailnorm", "mailnorm")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from the default location, or defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config directory; using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Loads settings from a file, or defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Settings file not found; using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&contents)?;
        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Parses settings from JSON, normalizing zero tunables to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings.normalized())
    }

    /// Writes settings to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn normalized(mut self) -> Self {
        let defaults = Settings::default();
        if self.retrieval.batch_size == 0 {
            self.retrieval.batch_size = defaults.retrieval.batch_size;
        }
        if self.retrieval.max_attachment_size == 0 {
            self.retrieval.max_attachment_size = defaults.retrieval.max_attachment_size;
        }
        if self.retrieval.timeout_seconds == 0 {
            self.retrieval.timeout_seconds = defaults.retrieval.timeout_seconds;
        }
        if self.keychain_service.trim().is_empty() {
            self.keychain_service = defaults.keychain_service;
        }
        self
    }

    /// Deadline for one batch.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval.timeout_seconds)
    }

    /// Attachment ceiling and call spacing for one provider's adapter.
    pub fn adapter_options(&self, service: EmailService) -> crate::providers::email::AdapterOptions {
        crate::providers::email::AdapterOptions {
            attachment_ceiling: self.retrieval.max_attachment_size,
            min_call_spacing: self.rate_limits.spacing(service),
        }
    }
}
