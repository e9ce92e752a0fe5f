use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::ai::client::DEFAULT_BASE_URL;
use crate::ai::GenerationOptions;

/// Environment variable that overrides `base_url`.
pub const URL_ENV: &str = "ADA_CHAT_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// tracing-subscriber filter directive, e.g. `"ada_chat_core=debug"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config directory, falling back to defaults when
    /// no file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config at {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Backend URL: environment first, then config, then the local default.
    pub fn base_url(&self) -> String {
        self.resolve_base_url(std::env::var(URL_ENV).ok())
    }

    fn resolve_base_url(&self, from_env: Option<String>) -> String {
        from_env
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn generation_options(&self) -> GenerationOptions {
        let defaults = GenerationOptions::default();
        GenerationOptions {
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ada-chat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.generation_options(), GenerationOptions::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            base_url: Some("http://10.0.0.2:5000".to_string()),
            max_tokens: Some(1024),
            ..Config::new()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.generation_options().max_tokens, 1024);
        assert!((loaded.generation_options().temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"temperature": 0.2}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_base_url_precedence() {
        let config = Config {
            base_url: Some("http://from-config".to_string()),
            ..Config::new()
        };
        assert_eq!(config.resolve_base_url(Some("http://from-env".into())), "http://from-env");
        assert_eq!(config.resolve_base_url(Some("  ".into())), "http://from-config");
        assert_eq!(config.resolve_base_url(None), "http://from-config");
        assert_eq!(Config::new().resolve_base_url(None), DEFAULT_BASE_URL);
    }
}
