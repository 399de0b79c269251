//! Persistent defaults for packaging runs
//!
//! The config file holds the values that rarely change between runs of the
//! same project: the host reference directories, the plugin output
//! directories, the excluded file names and the strict-version policy.
//! Command-line flags always take precedence over these values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "PLUGPACK_CONFIG";

/// Keys accepted by `get`/`set`
pub const KEYS: &[&str] = &["reference-dirs", "output-dirs", "except", "strict-version"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}. Supported keys: reference-dirs, output-dirs, except, strict-version")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_version: Option<bool>,
}

impl Config {
    /// Resolve the config file path.
    ///
    /// `PLUGPACK_CONFIG` wins when set and non-empty, otherwise the
    /// platform config directory is used.
    pub fn path() -> PathBuf {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        #[cfg(not(target_os = "windows"))]
        {
            dirs::home_dir().map_or_else(
                || PathBuf::from(".config/plugpack/plugpack.toml"),
                |h| h.join(".config").join("plugpack").join("plugpack.toml"),
            )
        }

        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map_or_else(
                || PathBuf::from("plugpack\\plugpack.toml"),
                |c| c.join("plugpack").join("plugpack.toml"),
            )
        }
    }

    /// Load from the resolved path, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::path())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "reference-dirs" => join_list(&self.reference_dirs),
            "output-dirs" => join_list(&self.output_dirs),
            "except" => join_list(&self.except),
            "strict-version" => self.strict_version.map(|v| v.to_string()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a key from its string form. List keys take comma-separated values;
    /// an empty value clears the key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "reference-dirs" => self.reference_dirs = split_list(value),
            "output-dirs" => self.output_dirs = split_list(value),
            "except" => self.except = split_list(value),
            "strict-version" => {
                self.strict_version = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?)
                };
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &Config::default()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).ok().flatten().map(|v| (*key, v)))
            .collect()
    }

    /// Strict-version policy, defaulting to strict when unset
    pub fn strict_version(&self) -> bool {
        self.strict_version.unwrap_or(true)
    }
}

fn join_list(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let config = Config::load_from_path(&temp_dir.path().join("absent.toml"));
        assert!(config.is_ok_and(|c| c.is_empty() && c.strict_version()));
    }

    #[test]
    fn test_set_and_get_list_keys() {
        let mut config = Config::default();
        assert!(config.set("reference-dirs", "C:/Host/Bin, C:/Host/Plugins,").is_ok());
        assert_eq!(
            config.reference_dirs,
            vec!["C:/Host/Bin".to_string(), "C:/Host/Plugins".to_string()]
        );
        assert_eq!(
            config.get("reference-dirs").ok().flatten().as_deref(),
            Some("C:/Host/Bin,C:/Host/Plugins")
        );

        assert!(config.set("except", "").is_ok());
        assert!(config.get("except").is_ok_and(|v| v.is_none()));
    }

    #[test]
    fn test_strict_version_parsing() {
        let mut config = Config::default();
        assert!(config.set("strict-version", "false").is_ok());
        assert!(!config.strict_version());
        assert!(matches!(
            config.set("strict-version", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(config.set("strict-version", "").is_ok());
        assert!(config.strict_version());
    }

    #[test]
    fn test_unknown_key() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("venv-path", "/tmp"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(config.get("venv-path"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("nested").join("plugpack.toml");

        let mut config = Config::default();
        assert!(config.set("output-dirs", "out/a,out/b").is_ok());
        assert!(config.set("strict-version", "false").is_ok());
        assert!(config.save_to_path(&path).is_ok());

        let loaded = Config::load_from_path(&path);
        assert!(loaded.is_ok_and(|c| c == config));
    }

    #[test]
    fn test_values_iter_skips_unset() {
        let mut config = Config::default();
        assert!(config.set("except", "Legacy.dll").is_ok());
        let values = config.values_iter();
        assert_eq!(values, vec![("except", "Legacy.dll".to_string())]);
    }
}
