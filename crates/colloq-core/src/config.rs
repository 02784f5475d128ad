//! Runtime configuration for the telemetry agent and the session cache.
//!
//! Every field has a serde default so a partial (or empty) `config.toml`
//! still deserializes into a complete configuration.

use crate::error::ColloqError;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ColloqConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ColloqConfig {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(content: &str) -> crate::error::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the agent and cache cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.cache.max_cached_messages == 0 {
            return Err(ColloqError::config("cache.max_cached_messages must be positive"));
        }
        if self.telemetry.cadence_window_ms == 0 {
            return Err(ColloqError::config("telemetry.cadence_window_ms must be positive"));
        }
        if self.telemetry.memory_interval_ms == 0 {
            return Err(ColloqError::config("telemetry.memory_interval_ms must be positive"));
        }
        let percent = self.telemetry.memory_warning_percent;
        if !(percent > 0.0 && percent <= 100.0) {
            return Err(ColloqError::config(format!(
                "telemetry.memory_warning_percent must be in (0, 100], got {percent}"
            )));
        }
        Ok(())
    }

    /// Serializes the configuration back to TOML text.
    pub fn to_toml_string(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Telemetry agent settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Minimum elapsed time before the frame cadence is recomputed.
    #[serde(default = "default_cadence_window_ms")]
    pub cadence_window_ms: u64,
    /// Period of the memory sampler.
    #[serde(default = "default_memory_interval_ms")]
    pub memory_interval_ms: u64,
    /// Heap usage percentage above which a warning is emitted.
    #[serde(default = "default_memory_warning_percent")]
    pub memory_warning_percent: f64,
    /// Window used when a caller does not pass one explicitly.
    #[serde(default = "default_summary_window_ms")]
    pub default_summary_window_ms: u64,
    /// Maximum age of an open timer. `None` keeps never-ended timers forever.
    #[serde(default)]
    pub max_open_timer_age_ms: Option<u64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            cadence_window_ms: default_cadence_window_ms(),
            memory_interval_ms: default_memory_interval_ms(),
            memory_warning_percent: default_memory_warning_percent(),
            default_summary_window_ms: default_summary_window_ms(),
            max_open_timer_age_ms: None,
        }
    }
}

/// Session cache settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Upper bound of the per-session message cache.
    #[serde(default = "default_max_cached_messages")]
    pub max_cached_messages: usize,
    /// Number of characters kept in a session's last-message preview.
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
    /// Preview shown for sessions without messages.
    #[serde(default = "default_empty_preview")]
    pub empty_preview: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cached_messages: default_max_cached_messages(),
            preview_length: default_preview_length(),
            empty_preview: default_empty_preview(),
        }
    }
}

fn default_cadence_window_ms() -> u64 {
    1000
}

fn default_memory_interval_ms() -> u64 {
    5000
}

fn default_memory_warning_percent() -> f64 {
    80.0
}

fn default_summary_window_ms() -> u64 {
    60_000
}

fn default_max_cached_messages() -> usize {
    100
}

fn default_preview_length() -> usize {
    50
}

fn default_empty_preview() -> String {
    "No messages yet".to_string()
}
