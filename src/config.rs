//! Configuration file parser for ~/.config/oldreader-sync/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde, though we log a warning when the file
//! contains potential typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::storage::NewSubscription;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The Debug impl masks `auth_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite database. Relative to the config directory when
    /// not absolute; `None` uses `oldreader-sync.db` there.
    pub database_path: Option<String>,

    /// Host (optionally with port) of the TheOldReader service.
    pub service_host: String,

    /// TheOldReader auth token. The `THEOLDREADER_AUTH_TOKEN` env var takes
    /// precedence over the config file.
    pub auth_token: Option<String>,

    /// Log every remote response body at trace level.
    pub log_raw_responses: bool,

    /// Upper bound on feed downloads in flight at once.
    pub max_concurrent_fetches: usize,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    pub subscriptions: Vec<SubscriptionConfig>,
}

/// One `[[subscriptions]]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SubscriptionConfig {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    /// TheOldReader's id for the feed, used to build the per-feed Atom URL.
    #[serde(default)]
    pub feed_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            service_host: "theoldreader.com".to_string(),
            auth_token: None,
            log_raw_responses: false,
            max_concurrent_fetches: 4,
            request_timeout_secs: 30,
            subscriptions: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("service_host", &self.service_host)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("log_raw_responses", &self.log_raw_responses)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "database_path",
        "service_host",
        "auth_token",
        "log_raw_responses",
        "max_concurrent_fetches",
        "request_timeout_secs",
        "subscriptions",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(content)?;
        if config.max_concurrent_fetches == 0 {
            tracing::warn!("max_concurrent_fetches must be at least 1, using 1");
            config.max_concurrent_fetches = 1;
        }
        tracing::info!(
            path = %path.display(),
            host = %config.service_host,
            subscriptions = config.subscriptions.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Configured subscriptions with usable URLs.
    ///
    /// Entries whose URL is not valid http(s) are skipped with a warning.
    /// A missing title falls back to the URL.
    pub fn subscriptions(&self) -> Vec<NewSubscription> {
        self.subscriptions
            .iter()
            .filter_map(|sub| match Url::parse(sub.url.trim()) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(NewSubscription {
                    title: sub
                        .title
                        .clone()
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| url.to_string()),
                    url: url.to_string(),
                    feed_id: sub.feed_id.clone().filter(|id| !id.trim().is_empty()),
                }),
                Ok(url) => {
                    tracing::warn!(
                        url = %sub.url,
                        scheme = %url.scheme(),
                        "Skipping subscription with unsupported scheme"
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!(
                        url = %sub.url,
                        error = %e,
                        "Skipping subscription with invalid URL"
                    );
                    None
                }
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
