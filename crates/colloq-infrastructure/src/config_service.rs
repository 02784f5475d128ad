//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the colloq configuration
//! from the configuration file (~/.config/colloq/config.toml).

use crate::paths::ColloqPaths;
use anyhow::{Context, Result};
use colloq_core::config::ColloqConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration service that loads and caches the colloq configuration.
///
/// A missing file is not an error: the defaults apply until one is written.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit file location; `None` resolves through [`ColloqPaths`].
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    /// Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<ColloqConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService reading the platform config file.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a ConfigService reading `path` instead of the default location.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// Load failures are logged and replaced by the defaults.
    pub fn get_config(&self) -> ColloqConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load().unwrap_or_else(|e| {
            tracing::warn!("[ConfigService] {:#}; using defaults", e);
            ColloqConfig::default()
        });

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Reads the configuration file without consulting the cache.
    pub fn load(&self) -> Result<ColloqConfig> {
        let path = self.config_path()?;
        if !path.exists() {
            tracing::debug!(
                "[ConfigService] {} not found, using defaults",
                path.display()
            );
            return Ok(ColloqConfig::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = ColloqConfig::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::debug!("[ConfigService] loaded {}", path.display());
        Ok(config)
    }

    /// Writes `config` to the configuration file and refreshes the cache.
    pub fn save(&self, config: &ColloqConfig) -> Result<PathBuf> {
        let path = self.config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        write_toml(&path, config)?;

        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(config.clone());
        Ok(path)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// The file this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(ColloqPaths::config_file()?),
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn write_toml(path: &Path, config: &ColloqConfig) -> Result<()> {
    let content = config.to_toml_string()?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(dir.path().join("config.toml"));

        assert_eq!(service.get_config(), ColloqConfig::default());
    }

    #[test]
    fn test_file_overrides_are_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nmax_cached_messages = 20\n").unwrap();

        let config = ConfigService::with_path(&path).get_config();

        assert_eq!(config.cache.max_cached_messages, 20);
        assert_eq!(config.cache.preview_length, 50);
    }

    #[test]
    fn test_config_is_cached_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let service = ConfigService::with_path(&path);
        assert_eq!(service.get_config().cache.preview_length, 50);

        std::fs::write(&path, "[cache]\npreview_length = 10\n").unwrap();
        assert_eq!(service.get_config().cache.preview_length, 50);

        service.invalidate_cache();
        assert_eq!(service.get_config().cache.preview_length, 10);
    }

    #[test]
    fn test_invalid_file_reports_error_but_get_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache\n").unwrap();
        let service = ConfigService::with_path(&path);

        assert!(service.load().is_err());
        assert_eq!(service.get_config(), ColloqConfig::default());
    }

    #[test]
    fn test_out_of_range_value_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[telemetry]\nmemory_interval_ms = 0\n").unwrap();
        let service = ConfigService::with_path(&path);

        let err = service.load().unwrap_err();
        assert!(format!("{err:#}").contains("memory_interval_ms"));
        assert_eq!(service.get_config(), ColloqConfig::default());
    }

    #[test]
    fn test_save_creates_parent_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let service = ConfigService::with_path(&path);

        let mut config = ColloqConfig::default();
        config.telemetry.memory_interval_ms = 250;
        service.save(&config).unwrap();

        service.invalidate_cache();
        assert_eq!(service.get_config().telemetry.memory_interval_ms, 250);
    }
}
