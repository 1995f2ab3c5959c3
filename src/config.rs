//! Configuration file parser for reviewfeed.
//!
//! The config file is optional: a missing or blank file yields
//! `Config::default()`. Unknown keys are accepted but logged, since they are
//! most likely typos.
use crate::feed::{FeedSettings, DEFAULT_PAGE_SIZE, DEFAULT_PREFETCH_SCREENS};
use crate::images::{DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

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

    /// Parsed fine, but a value is out of range.
    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reviews requested per page. Must be at least 1.
    pub page_size: usize,

    /// Load the next page once fewer than this many viewport heights of
    /// content remain below the scroll target.
    pub prefetch_screens: f64,

    /// Decoded images kept in memory (0 = unlimited).
    pub image_cache_capacity: usize,

    /// Per-request timeout for image downloads, in seconds.
    pub image_timeout_secs: u64,

    /// Largest image body accepted, in bytes.
    pub max_image_bytes: usize,

    /// Artificial delay before each page read from a local review file.
    pub source_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_screens: DEFAULT_PREFETCH_SCREENS,
            image_cache_capacity: 0,
            image_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_image_bytes: DEFAULT_MAX_BYTES,
            source_latency_ms: 0,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "page_size",
        "prefetch_screens",
        "image_cache_capacity",
        "image_timeout_secs",
        "max_image_bytes",
        "source_latency_ms",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range value → `Err(ConfigError::Invalid)`
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
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            page_size = config.page_size,
            prefetch_screens = config.prefetch_screens,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate TOML text. Blank text yields the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }

        if !self.prefetch_screens.is_finite() || self.prefetch_screens < 0.0 {
            return Err(ConfigError::Invalid {
                key: "prefetch_screens",
                reason: format!("{} is not a non-negative number", self.prefetch_screens),
            });
        }

        if self.image_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "image_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            page_size: self.page_size,
            prefetch_screens: self.prefetch_screens,
        }
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn source_latency(&self) -> Duration {
        Duration::from_millis(self.source_latency_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
