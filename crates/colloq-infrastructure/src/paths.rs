//! Path management for colloq configuration files.
//!
//! Directories are resolved through the `dirs` crate so each platform gets
//! its conventional location.

use std::path::PathBuf;

const APP_NAME: &str = "colloq";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Path management for colloq.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/colloq/            # Config directory
/// ├── config.toml              # Telemetry and cache settings
/// └── exports/                 # Metrics exports from `colloq demo --save`
/// ```
pub struct ColloqPaths;

impl ColloqPaths {
    /// Returns the colloq configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/colloq/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory metrics exports are written to.
    pub fn exports_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("exports"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let config_dir = ColloqPaths::config_dir().unwrap();
        assert!(config_dir.ends_with("colloq"));
    }

    #[test]
    fn test_config_file() {
        let config_file = ColloqPaths::config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        let config_dir = ColloqPaths::config_dir().unwrap();
        assert!(config_file.starts_with(&config_dir));
    }

    #[test]
    fn test_exports_dir() {
        let exports_dir = ColloqPaths::exports_dir().unwrap();
        assert!(exports_dir.ends_with("exports"));
    }
}
