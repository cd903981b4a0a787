use crate::error::{KuttiError, Result};
use crate::grid::PAGE_SIZE_OPTIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_API_BASE: &str = "http://127.0.0.1:5001";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_LANGUAGE: &str = "en";

/// Keys accepted by `kutti config`, in display order.
pub const KEYS: &[&str] = &["api-base", "timeout", "page-size", "language"];

/// Console configuration, stored as `config.json` in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KuttiConfig {
    /// Root URL of the REST API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Rows per page for listings
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Language translated fields are shown in
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for KuttiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            language: default_language(),
        }
    }
}

impl KuttiConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: KuttiConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "api-base" => Some(self.api_base.clone()),
            "timeout" => Some(self.timeout_secs.to_string()),
            "page-size" => Some(self.page_size.to_string()),
            "language" => Some(self.language.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "api-base" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(KuttiError::Config(format!(
                        "api-base must be an http(s) URL, got '{}'",
                        value
                    )));
                }
                self.api_base = value.trim_end_matches('/').to_string();
            }
            "timeout" => {
                self.timeout_secs = value
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| {
                        KuttiError::Config(format!("timeout must be a positive number, got '{}'", value))
                    })?;
            }
            "page-size" => {
                self.page_size = value
                    .parse()
                    .ok()
                    .filter(|size| PAGE_SIZE_OPTIONS.contains(size))
                    .ok_or_else(|| {
                        KuttiError::Config(format!(
                            "page-size must be one of {:?}, got '{}'",
                            PAGE_SIZE_OPTIONS, value
                        ))
                    })?;
            }
            "language" => {
                if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
                    return Err(KuttiError::Config(format!(
                        "language must be a language code such as 'en', got '{}'",
                        value
                    )));
                }
                self.language = value.to_lowercase();
            }
            other => return Err(KuttiError::Config(format!("Unknown config key: {}", other))),
        }
        Ok(())
    }

    pub fn list_all(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }
}
