//! Configuration system for surfmon
//!
//! Provides:
//! - Default configuration, written out when no file exists yet
//! - JSON or TOML parsing with serde, picked by file extension
//! - Whole-file rewrite after every mutation
//! - Validation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Default configuration file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete surfmon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Outbound forwarding
    pub api: ApiSettings,

    /// Watching, persistence and history
    pub monitoring: MonitoringSettings,
}

/// Outbound forwarding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Forward decoded records
    pub enabled: bool,

    /// Endpoint URL records are POSTed to
    pub endpoint: String,

    /// Bearer token, sent only when non-empty
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Static headers added to every request
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            "User-Agent".to_string(),
            format!("surfmon/{}", crate::SURFMON_VERSION),
        );

        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: String::new(),
            timeout_secs: 10,
            headers,
        }
    }
}

/// Monitoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Directory observed for new `.msg` files
    pub watch_directory: PathBuf,

    /// Directory for persisted records and the monitor log
    pub output_directory: PathBuf,

    /// Maximum records kept in memory
    pub max_history: usize,

    /// Persist each record to its own file
    pub save_to_disk: bool,

    /// Report the default language even when the `en:` marker is missing
    pub legacy_language_default: bool,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            watch_directory: PathBuf::from("."),
            output_directory: PathBuf::from("logs"),
            max_history: 100,
            save_to_disk: true,
            legacy_language_default: false,
        }
    }
}

impl AppConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.monitoring.max_history == 0 {
            return Err(ConfigError::ValidationError(
                "monitoring.max_history must be at least 1".to_string(),
            ));
        }

        if self.api.enabled {
            let endpoint = self.api.endpoint.trim();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "api.endpoint must be an http(s) URL when forwarding is enabled, got {:?}",
                    self.api.endpoint
                )));
            }
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// On-disk encoding of the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML, everything else JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }

    fn parse(self, content: &str) -> ConfigResult<AppConfig> {
        Ok(match self {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        })
    }

    fn render(self, config: &AppConfig) -> ConfigResult<String> {
        Ok(match self {
            ConfigFormat::Json => serde_json::to_string_pretty(config)?,
            ConfigFormat::Toml => toml::to_string_pretty(config)?,
        })
    }
}

/// Owner of the configuration file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    format: ConfigFormat,
}

impl ConfigStore {
    /// Store backed by `path`, or `config.json` when none is given
    pub fn new(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let format = ConfigFormat::from_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, writing the defaults first if the file is absent
    pub fn load_or_create(&self) -> ConfigResult<AppConfig> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "Config file not found, creating default");
            let config = AppConfig::default();
            self.save(&config)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let config = self.format.parse(&content)?;
        config.validate()?;

        debug!(path = %self.path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Rewrite the whole file
    pub fn save(&self, config: &AppConfig) -> ConfigResult<()> {
        let content = self.format.render(config)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&self.path, content).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }

    /// Enable forwarding to `endpoint` and persist
    pub fn update_api(
        &self,
        config: &mut AppConfig,
        endpoint: &str,
        api_key: Option<&str>,
    ) -> ConfigResult<()> {
        let mut updated = config.clone();
        updated.api.enabled = true;
        updated.api.endpoint = endpoint.to_string();
        updated.api.api_key = api_key.unwrap_or_default().to_string();
        updated.validate()?;
        self.save(&updated)?;
        *config = updated;
        info!(endpoint = %endpoint, "API configuration updated");
        Ok(())
    }

    /// Point monitoring at new directories and persist
    pub fn update_monitoring(
        &self,
        config: &mut AppConfig,
        watch_directory: &Path,
        output_directory: &Path,
    ) -> ConfigResult<()> {
        config.monitoring.watch_directory = watch_directory.to_path_buf();
        config.monitoring.output_directory = output_directory.to_path_buf();
        self.save(config)
    }
}
