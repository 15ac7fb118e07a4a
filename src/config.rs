//! Configuration, loaded from `~/.partybook/config.json`.
//!
//! Only `directoryBaseUrl` is required; everything else has a default.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    NoHomeDir,
    #[error("Config file not found at {0}. Create it with: {{ \"directoryBaseUrl\": \"https://...\" }}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("directoryBaseUrl is empty")]
    MissingBaseUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the remote directory service.
    pub directory_base_url: String,
    /// Bearer token for the directory, if it requires one.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Quiet interval after the last keystroke before a lookup fires.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Queries shorter than this never reach the network.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    /// Maximum candidates requested per lookup.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// How long a successfully submitted form stays open before closing.
    #[serde(default = "default_auto_close_ms")]
    pub auto_close_ms: u64,
}

fn default_debounce_ms() -> u64 {
    350
}

fn default_min_query_len() -> usize {
    2
}

fn default_search_limit() -> usize {
    20
}

fn default_auto_close_ms() -> u64 {
    900
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory_base_url: String::new(),
            api_token: None,
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
            search_limit: default_search_limit(),
            auto_close_ms: default_auto_close_ms(),
        }
    }
}

/// Canonical config file path (`~/.partybook/config.json`).
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".partybook").join("config.json"))
}

/// Load and validate configuration from disk.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        return Err(ConfigError::NotFound(path));
    }

    let content = fs::read_to_string(&path)?;
    let config: Config = serde_json::from_str(&content)?;

    if config.directory_base_url.trim().is_empty() {
        return Err(ConfigError::MissingBaseUrl);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"directoryBaseUrl": "https://directory.example/api/"}"#)
                .unwrap();
        assert_eq!(config.debounce_ms, 350);
        assert_eq!(config.min_query_len, 2);
        assert_eq!(config.search_limit, 20);
        assert_eq!(config.auto_close_ms, 900);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_overrides_win() {
        let config: Config = serde_json::from_str(
            r#"{
                "directoryBaseUrl": "https://directory.example/api/",
                "debounceMs": 500,
                "minQueryLen": 3,
                "apiToken": "tok-1"
            }"#,
        )
        .unwrap();
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.min_query_len, 3);
        assert_eq!(config.api_token.as_deref(), Some("tok-1"));
    }
}
