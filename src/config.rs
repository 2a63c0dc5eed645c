//! Application configuration.
//!
//! Store connection settings come from the environment first and fall back to
//! a JSON config file written by `baripronto connect`. Both the URL and the
//! access key are required; missing either is a fatal configuration error
//! raised before any query is attempted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{env, fs, path::Path};
use thiserror::Error;

/// Environment variable holding the store's base URL.
pub const URL_ENV_VAR: &str = "BARIPRONTO_URL";

/// Environment variable holding the store's access key.
pub const KEY_ENV_VAR: &str = "BARIPRONTO_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing store URL: set {} or run `baripronto connect`", URL_ENV_VAR)]
    MissingUrl,

    #[error("missing store access key: set {} or run `baripronto connect`", KEY_ENV_VAR)]
    MissingKey,

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    pub key: String,
}

impl Config {
    pub fn new(url: String, key: String) -> Self {
        Config { url, key }
    }

    /// Resolved connection settings: environment variables win, the config
    /// file fills the gaps.
    ///
    /// A config file that exists but cannot be read or parsed is an error,
    /// not a silent fallback to the missing-setting messages.
    pub fn resolve(path: &Path) -> Result<Self, ConfigError> {
        let file = match path.exists() {
            true => Some(Config::load_from_file(path)?),
            false => None,
        };
        Self::resolve_from(
            env::var(URL_ENV_VAR).ok(),
            env::var(KEY_ENV_VAR).ok(),
            file,
        )
    }

    fn resolve_from(
        env_url: Option<String>,
        env_key: Option<String>,
        file: Option<Config>,
    ) -> Result<Self, ConfigError> {
        let url = non_empty(env_url)
            .or_else(|| non_empty(file.as_ref().map(|c| c.url.clone())))
            .ok_or(ConfigError::MissingUrl)?;
        let key = non_empty(env_key)
            .or_else(|| non_empty(file.map(|c| c.key)))
            .ok_or(ConfigError::MissingKey)?;
        Ok(Config { url, key })
    }

    /// Loads configuration from a JSON file at the given path.
    ///
    /// # Errors
    /// Returns an `std::io::Error` if reading from file fails or JSON is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let buf = fs::read(path)?;
        let config: Config = serde_json::from_slice(&buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Saves the configuration to a JSON file at the given path.
    ///
    /// Directories will be created if they don't exist. This method overwrites
    /// existing files.
    ///
    /// # Errors
    /// Returns an `std::io::Error` if writing to file fails or serialization fails.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Removes the saved connection settings, if any.
    pub fn clear(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Path of the config file: `~/.baripronto/config.json`.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let home = home::home_dir().ok_or_else(|| {
        ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "home directory not found",
        ))
    })?;
    Ok(home.join(".baripronto").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn sample() -> Config {
        Config::new(
            "https://registry.example.com".to_string(),
            "service-key".to_string(),
        )
    }

    #[test]
    // Loading a saved configuration file should return the same configuration.
    fn test_load_recovers_saved_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = sample();
        config.save(&path).unwrap();

        let loaded_config = Config::load_from_file(&path).unwrap();
        assert_eq!(config, loaded_config);
    }

    #[test]
    // Saving a configuration should create directories if they don't exist.
    fn test_save_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent_dir").join("config.json");

        let result = sample().save(&path);

        assert!(result.is_ok(), "Failed to save config");
        assert!(
            path.parent().unwrap().exists(),
            "Parent directory does not exist"
        );
    }

    #[test]
    // Loading an invalid JSON file should return an error.
    fn test_load_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid_config.json");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = Config::load_from_file(&path);
        assert!(result.is_err());
    }

    #[test]
    // Clearing a missing config file is not an error.
    fn test_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        sample().save(&path).unwrap();
        Config::clear(&path).unwrap();
        assert!(!path.exists());
        Config::clear(&path).unwrap();
    }

    #[test]
    // A config file that exists but is not valid JSON surfaces the parse
    // error instead of reporting a missing URL.
    fn test_resolve_surfaces_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        let err = Config::resolve(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    // Environment values take precedence over the config file.
    fn test_resolve_prefers_environment() {
        let resolved = Config::resolve_from(
            Some("https://env.example.com".to_string()),
            None,
            Some(sample()),
        )
        .unwrap();
        assert_eq!(resolved.url, "https://env.example.com");
        assert_eq!(resolved.key, "service-key");
    }

    #[test]
    // Blank environment values do not shadow the config file.
    fn test_resolve_ignores_blank_environment() {
        let resolved =
            Config::resolve_from(Some("   ".to_string()), None, Some(sample())).unwrap();
        assert_eq!(resolved.url, "https://registry.example.com");
    }

    #[test]
    // Missing URL or key is a fatal configuration error.
    fn test_resolve_requires_both_settings() {
        assert!(matches!(
            Config::resolve_from(None, None, None),
            Err(ConfigError::MissingUrl)
        ));
        assert!(matches!(
            Config::resolve_from(Some("https://env.example.com".to_string()), None, None),
            Err(ConfigError::MissingKey)
        ));
    }
}
