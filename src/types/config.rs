//! Configuration structures.
//!
//! Configuration is loaded from defaults, an optional JSON file, and
//! environment variable overrides (in that order).

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::errors::{Error, Result};

/// Global threadchan configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Channel construction defaults.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Channel construction defaults and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Capacity used when a caller does not pick one.
    pub default_capacity: usize,

    /// Largest capacity accepted by checked construction.
    pub max_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            default_capacity: 64,
            max_capacity: 1 << 20,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file. Missing sections fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `THREADCHAN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `THREADCHAN_*` environment overrides in place.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("THREADCHAN_DEFAULT_CAPACITY") {
            self.channel.default_capacity = parse_usize("THREADCHAN_DEFAULT_CAPACITY", &raw)?;
        }
        if let Some(raw) = lookup("THREADCHAN_MAX_CAPACITY") {
            self.channel.max_capacity = parse_usize("THREADCHAN_MAX_CAPACITY", &raw)?;
        }
        if let Some(level) = lookup("THREADCHAN_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("THREADCHAN_LOG_FORMAT") {
            self.observability.json_logs = format.eq_ignore_ascii_case("json");
        }
        self.validate()
    }

    /// Reject configurations that could never build a channel.
    pub fn validate(&self) -> Result<()> {
        if self.channel.default_capacity == 0 {
            return Err(Error::config("channel.default_capacity must be positive"));
        }
        if self.channel.default_capacity > self.channel.max_capacity {
            return Err(Error::config(format!(
                "channel.default_capacity {} exceeds channel.max_capacity {}",
                self.channel.default_capacity, self.channel.max_capacity
            )));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| Error::config(format!("{key} must be a non-negative integer, got {raw:?}")))
}
