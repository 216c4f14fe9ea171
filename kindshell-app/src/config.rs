use kindshell_tasks::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "KINDSHELL_CONFIG";
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// `/current/dir $ `
    #[default]
    Cwd,
    /// `$ `
    Plain,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub units: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            units: "metric".to_string(),
        }
    }
}

impl FetchConfig {
    /// The environment variable wins over the file.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub prompt: PromptStyle,
    /// Default tracing filter when `KINDSHELL_LOG` / `RUST_LOG` are unset.
    pub log_level: String,
    pub scheduler: SchedulerConfig,
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: PromptStyle::Cwd,
            log_level: "warn".to_string(),
            scheduler: SchedulerConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// `$KINDSHELL_CONFIG`, else `~/.config/kindshell/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        home_dir().map(|home| home.join(".config").join("kindshell").join("config.yaml"))
    }

    /// Load from the default location; defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.scan_interval_ms < 10 {
            return Err(ConfigError::Invalid(
                "scheduler.scan_interval_ms must be at least 10".to_string(),
            ));
        }
        if self.scheduler.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.history_limit must be at least 1".to_string(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level cannot be empty".to_string()));
        }
        if self.fetch.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("fetch.base_url cannot be empty".to_string()));
        }
        Ok(())
    }
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
