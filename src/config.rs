use anyhow::{Context as _, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables consulted for the question-answering API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["TABLETALK_API_KEY", "OPENAI_API_KEY"];

/// Decoding parameters for the question-answering service.
///
/// Defaults lean deterministic: low temperature, narrow nucleus, bounded output.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AIConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Alternative OpenAI-compatible endpoint
    pub api_base: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.2,
            top_p: 0.85,
            max_tokens: 1024,
            api_base: None,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AIConfig,
    /// Rows shown in the table summary preview
    pub preview_rows: usize,
    /// Gate upload, transform and export (not just questions) behind the API key
    pub require_credentials_for_all: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai: AIConfig::default(),
            preview_rows: 5,
            require_credentials_for_all: false,
        }
    }
}

/// `<data dir>/tabletalk/config.json`
pub fn get_config_path() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("tabletalk").join("config.json"))
}

/// Load the config from the default location, falling back to defaults.
pub fn load_app_config() -> AppConfig {
    match get_config_path() {
        Ok(path) => load_app_config_from(&path),
        Err(e) => {
            tracing::warn!("Using default configuration: {e:#}");
            AppConfig::default()
        }
    }
}

/// Missing or unreadable files yield the defaults.
pub fn load_app_config_from(path: &Path) -> AppConfig {
    if path.exists()
        && let Ok(content) = std::fs::read_to_string(path)
    {
        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => return config,
            Err(e) => tracing::warn!("Ignoring invalid config {}: {e}", path.display()),
        }
    }
    AppConfig::default()
}

pub fn save_app_config(config: &AppConfig) -> Result<()> {
    save_app_config_to(config, &get_config_path()?)
}

pub fn save_app_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}

/// Read the API key from the environment after loading `.env` if present.
pub fn api_key_from_env() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|key| key.trim().to_owned())
        .find(|key| !key.is_empty())
        .map(|key| SecretString::new(key.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.preview_rows, 5);
        assert!(!config.require_credentials_for_all);
        assert_eq!(config.ai.temperature, 0.2);
        assert_eq!(config.ai.top_p, 0.85);
        assert_eq!(config.ai.max_tokens, 1024);
    }

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.preview_rows = 8;
        config.ai.model = "local-model".to_owned();
        config.ai.api_base = Some("http://localhost:8080/v1".to_owned());
        save_app_config_to(&config, &path)?;

        assert_eq!(load_app_config_from(&path), config);
        Ok(())
    }

    #[test]
    fn test_missing_and_corrupt_files_fall_back() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        assert_eq!(load_app_config_from(&path), AppConfig::default());

        std::fs::write(&path, "{ not json")?;
        assert_eq!(load_app_config_from(&path), AppConfig::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"require_credentials_for_all": true}"#)?;

        let config = load_app_config_from(&path);
        assert!(config.require_credentials_for_all);
        assert_eq!(config.ai, AIConfig::default());
        Ok(())
    }
}
