//! Configuration loading from estates.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    /// History listing defaults.
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Where the SQLite database lives.
#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    /// Database file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    /// Page size when `--limit` is not given.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Hard cap on any page.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    audit::DEFAULT_MAX_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let history = &self.history;
        if history.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "history.max_page_size must be at least 1".to_string(),
            ));
        }
        if history.page_size == 0 || history.page_size > history.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "history.page_size must be between 1 and {}",
                history.max_page_size
            )));
        }
        Ok(())
    }

    /// Resolve the database path.
    pub fn database_path(&self) -> PathBuf {
        self.storage.path.clone().unwrap_or_else(|| {
            dirs_data_dir()
                .unwrap_or_else(|| ".estates".into())
                .join("estates.db")
        })
    }
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/estates"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("estates"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("estates"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
