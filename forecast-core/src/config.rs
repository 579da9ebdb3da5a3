use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::TemperatureUnit;

/// What happens to a pending search when a newer keystroke arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPolicy {
    /// A new keystroke cancels the pending debounce and any search still running.
    #[default]
    CancelPrevious,
    /// Every keystroke gets its own debounce task; whichever resolves last wins.
    Concurrent,
}

impl TryFrom<&str> for SearchPolicy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().replace('-', "_").as_str() {
            "cancel_previous" => Ok(SearchPolicy::CancelPrevious),
            "concurrent" => Ok(SearchPolicy::Concurrent),
            _ => Err(anyhow!(
                "Unknown search policy '{value}'. Supported policies: cancel-previous, concurrent."
            )),
        }
    }
}

/// What an empty query does to the candidate list once the debounce elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyQueryPolicy {
    /// Leave the previous candidates in place.
    #[default]
    Keep,
    Clear,
}

/// Remote endpoints used by the HTTP providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub forecast_base_url: String,
    pub geocoding_base_url: String,
    pub user_agent: String,
    pub search_limit: u8,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            forecast_base_url: "https://api.open-meteo.com".to_string(),
            geocoding_base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("forecast/", env!("CARGO_PKG_VERSION")).to_string(),
            search_limit: 8,
            request_timeout_secs: 10,
        }
    }
}

/// Host probed to decide whether the network is reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            host: "api.open-meteo.com".to_string(),
            port: 443,
            timeout_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the snapshot file; defaults to the platform data dir.
    pub snapshot_file: Option<PathBuf>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// search_debounce_ms = 1000
/// search_policy = "cancel_previous"
/// temperature_unit = "celsius"
///
/// [api]
/// geocoding_base_url = "https://nominatim.openstreetmap.org"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search_debounce_ms: u64,
    pub search_policy: SearchPolicy,
    pub empty_query: EmptyQueryPolicy,
    pub temperature_unit: TemperatureUnit,
    pub api: ApiConfig,
    pub reachability: ReachabilityConfig,
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_debounce_ms: 1000,
            search_policy: SearchPolicy::default(),
            empty_query: EmptyQueryPolicy::default(),
            temperature_unit: TemperatureUnit::default(),
            api: ApiConfig::default(),
            reachability: ReachabilityConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "forecast", "forecast")
            .ok_or_else(|| anyhow!("Could not determine platform directories"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where the weather snapshot is kept unless `storage.snapshot_file` says otherwise.
    pub fn snapshot_file_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.snapshot_file {
            return Ok(path.clone());
        }
        Ok(Self::project_dirs()?.data_dir().join("weather.json"))
    }
}
