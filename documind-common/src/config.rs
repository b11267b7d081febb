//! Configuration management for the DocuMind client.
//!
//! The client reads a single configuration file at `~/.documind/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (DOCUMIND_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `DOCUMIND_API_URL` → api.base_url
//! - `DOCUMIND_API_TIMEOUT_SECS` → api.timeout_secs
//! - `DOCUMIND_POLL_INTERVAL` → polling.interval_secs (accepts `5`, `5s`, `1m`)
//! - `DOCUMIND_LOG_LEVEL` → observability.log_level
//! - `DOCUMIND_LOG_FORMAT` → observability.log_format

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result, ResultExt};
use crate::util::parse_duration_secs;

/// Default origin of the RAG backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".documind"),
        |dirs| dirs.home_dir().join(".documind"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Backend API
// ============================================================================

/// Connection settings for the remote RAG service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Origin all requests are issued against
    #[serde(default = "default_api_url", alias = "url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Document status polling
// ============================================================================

/// Document status polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between document list refreshes while ingestion is in flight
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets clamped to `warn`.
    ///
    /// Built-in noisy modules (hyper, reqwest, h2, rustls) are always
    /// filtered; this list adds to them.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// JSON Schema reference
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Backend connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Document status polling
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration (default path or `path`), apply environment
    /// overrides, and validate the result.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DOCUMIND_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DOCUMIND_API_URL") {
            self.api.base_url = url;
        }

        if let Some(timeout) = lookup("DOCUMIND_API_TIMEOUT_SECS") {
            self.api.timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::Config(format!("DOCUMIND_API_TIMEOUT_SECS is not a number: {timeout}"))
            })?;
        }

        if let Some(interval) = lookup("DOCUMIND_POLL_INTERVAL") {
            let trimmed = interval.trim();
            self.polling.interval_secs = match trimmed.parse::<u64>() {
                Ok(secs) => secs,
                Err(_) => parse_duration_secs(trimmed)
                    .map_err(|e| Error::Config(format!("DOCUMIND_POLL_INTERVAL: {e}")))?,
            };
        }

        if let Some(level) = lookup("DOCUMIND_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Some(format) = lookup("DOCUMIND_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        Ok(())
    }
}
