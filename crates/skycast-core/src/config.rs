use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Base name of the optional config file (`skycast.toml`, `skycast.json`, ...)
pub const CONFIG_FILE_NAME: &str = "skycast";

pub const DEFAULT_WEATHER_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Service configuration.
///
/// Every field can be set from the environment using its upper-case name
/// (`WEATHER_API_KEY`, `DB_PATH`, ...) or from an optional `skycast.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Visual Crossing API key
    #[serde(default)]
    pub weather_api_key: String,

    /// SQLite database holding the `users` table
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding one cache entry per city
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Cache freshness window in minutes (0 = entries never expire)
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,

    /// Address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Timeline endpoint of the weather provider
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    /// Upstream request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("users.db")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("weather_cache")
}

fn default_cache_ttl_minutes() -> u64 {
    60
}

fn default_bind_addr() -> String {
    "0.0.0.0:5002".to_string()
}

fn default_weather_base_url() -> String {
    DEFAULT_WEATHER_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather_api_key: String::new(),
            db_path: default_db_path(),
            cache_dir: default_cache_dir(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            bind_addr: default_bind_addr(),
            weather_base_url: default_weather_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// The API key stays out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "weather_api_key",
                &if self.weather_api_key.is_empty() { "<unset>" } else { "<redacted>" },
            )
            .field("db_path", &self.db_path)
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl_minutes", &self.cache_ttl_minutes)
            .field("bind_addr", &self.bind_addr)
            .field("weather_base_url", &self.weather_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from `.env`, `skycast.toml` (both optional) and the
    /// environment.
    ///
    /// Environment variables win over the file.
    ///
    /// # Errors
    /// Returns `ConfigError::ParseError` if a source is malformed or a value
    /// has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        let settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE_NAME).required(false))
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Self::from_settings(settings)
    }

    /// Build a `Config` from already-assembled settings.
    ///
    /// # Errors
    /// Returns `ConfigError::ParseError` when a value cannot be deserialized.
    pub fn from_settings(settings: config::Config) -> Result<Self, ConfigError> {
        Ok(settings.try_deserialize()?)
    }

    /// Load configuration and validate it
    ///
    /// Logs warnings and fails on errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.weather_api_key.trim().is_empty() {
            result.add_error("weather_api_key", "WEATHER_API_KEY must be set");
        }

        if self.db_path.as_os_str().is_empty() {
            result.add_error("db_path", "DB_PATH must not be empty");
        }

        if self.cache_dir.as_os_str().is_empty() {
            result.add_error("cache_dir", "CACHE_DIR must not be empty");
        } else if self.cache_dir.exists() && !self.cache_dir.is_dir() {
            result.add_error(
                "cache_dir",
                format!("Path is not a directory: {}", self.cache_dir.display()),
            );
        }

        if self.cache_ttl_minutes == 0 {
            result.add_warning(
                "cache_ttl_minutes",
                "Cache expiry disabled (0 minutes); entries live until invalidated",
            );
        }

        if self.bind_addr.parse::<SocketAddr>().is_err() {
            result.add_error(
                "bind_addr",
                format!("Not a socket address: {}", self.bind_addr),
            );
        }

        self.validate_url(&self.weather_base_url, "weather_base_url", &mut result);

        if self.request_timeout_secs == 0 {
            result.add_error("request_timeout_secs", "Timeout must be greater than 0");
        } else if self.request_timeout_secs > 120 {
            result.add_warning(
                "request_timeout_secs",
                "Upstream timeout is unusually long (>120s)",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Parsed listen address.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if `bind_addr` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bind_addr {}: {}", self.bind_addr, e)))
    }

    /// Cache freshness window, `None` when expiry is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_minutes > 0).then(|| Duration::from_secs(self.cache_ttl_minutes * 60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
