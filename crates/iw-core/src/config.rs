use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

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

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Fetch session policy
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Background refresh trigger
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Launcher summary (app glance)
    #[serde(default)]
    pub glance: GlanceConfig,

    /// Persistent cache location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Phone-side companion that performs the internet lookup
    #[serde(default)]
    pub companion: CompanionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Seconds to wait for a response before the session times out
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum fetch attempts per activation; absent means keep retrying
    /// for as long as the loading screen is on top.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Number of outbound messages the relay will queue
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_outbox_capacity() -> usize {
    4
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            max_attempts: None,
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Minutes between background refresh activations
    #[serde(default = "default_refresh_interval")]
    pub interval_minutes: u32,
}

fn default_refresh_interval() -> u32 {
    60
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_refresh_interval(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlanceConfig {
    /// Minutes before the launcher summary expires
    #[serde(default = "default_glance_expiry")]
    pub expiry_minutes: u32,
}

fn default_glance_expiry() -> u32 {
    60
}

impl Default for GlanceConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: default_glance_expiry(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding the last known reading (defaults to
    /// `<config_dir>/weather.db`)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    /// Current-weather endpoint
    #[serde(default = "default_companion_api_url")]
    pub api_url: String,

    /// OpenWeatherMap API key (can be set via environment)
    #[serde(default = "default_companion_api_key")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,
}

fn default_companion_api_url() -> String {
    "http://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_companion_api_key() -> Option<String> {
    std::env::var("OPENWEATHERMAP_API_KEY").ok()
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            api_url: default_companion_api_url(),
            api_key: default_companion_api_key(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

impl CompanionConfig {
    /// Check if an API key is configured (not a placeholder)
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty() && !key.starts_with("YOUR_"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("instant-weather");

        Self {
            config_dir,
            fetch: FetchConfig::default(),
            refresh: RefreshConfig::default(),
            glance: GlanceConfig::default(),
            storage: StorageConfig::default(),
            companion: CompanionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating a default file if
    /// it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(config_path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match config_path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
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

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.fetch.timeout_secs == 0 {
            result.add_error("fetch.timeout_secs", "Fetch timeout must be greater than 0");
        } else if self.fetch.timeout_secs > 3600 {
            result.add_warning("fetch.timeout_secs", "Fetch timeout is more than an hour");
        }

        if self.fetch.max_attempts == Some(0) {
            result.add_error("fetch.max_attempts", "At least one fetch attempt is required");
        }

        if self.fetch.outbox_capacity == 0 {
            result.add_error("fetch.outbox_capacity", "Relay outbox must hold at least one message");
        }

        if self.refresh.interval_minutes == 0 {
            result.add_error(
                "refresh.interval_minutes",
                "Refresh interval must be greater than 0",
            );
        } else if self.refresh.interval_minutes > 1440 {
            result.add_warning(
                "refresh.interval_minutes",
                "Background refresh interval is more than 24 hours",
            );
        }

        if self.glance.expiry_minutes == 0 {
            result.add_warning("glance.expiry_minutes", "Launcher summary expires immediately");
        }

        self.validate_url(&self.companion.api_url, "companion.api_url", &mut result);

        if !(-90.0..=90.0).contains(&self.companion.latitude) {
            result.add_error("companion.latitude", "Latitude must be between -90 and 90");
        }
        if !(-180.0..=180.0).contains(&self.companion.longitude) {
            result.add_error("companion.longitude", "Longitude must be between -180 and 180");
        }

        if !self.companion.is_configured() {
            result.add_warning(
                "companion.api_key",
                "OpenWeatherMap API key not configured - weather lookups will fail",
            );
        }

        result
    }

    /// Validate a URL field
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

    /// Path of the SQLite cache, resolved against `config_dir`
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| self.config_dir.join("weather.db"))
    }

    /// Path the launcher summary is written to
    pub fn glance_path(&self) -> PathBuf {
        self.config_dir.join("glance.json")
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("instant-weather");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.companion.api_key = Some("abc123".to_string());
        config
    }

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        // Default config should be valid (only warnings, no errors)
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let mut config = configured();
        config.fetch.timeout_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "fetch.timeout_secs"));
    }

    #[test]
    fn test_zero_max_attempts_is_error() {
        let mut config = configured();
        config.fetch.max_attempts = Some(0);
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_zero_refresh_interval_is_error() {
        let mut config = configured();
        config.refresh.interval_minutes = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "refresh.interval_minutes"));
    }

    #[test]
    fn test_load_validated_rejects_zero_refresh_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = configured();
        config.refresh.interval_minutes = 0;
        config.save_to(&path).unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("refresh.interval_minutes"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = configured();
        config.companion.api_url = "ftp://api.example.com/weather".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_missing_api_key_is_warning() {
        let mut config = Config::default();
        config.companion.api_key = None;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "companion.api_key"));
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let mut config = configured();
        config.companion.latitude = 91.0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "companion.latitude"));
    }

    #[test]
    fn test_refresh_interval_conversion() {
        let refresh = RefreshConfig { interval_minutes: 60 };
        assert_eq!(refresh.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.fetch.timeout_secs, 60);
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/iw\"\n\n[fetch]\ntimeout_secs = 3600\nmax_attempts = 5\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.fetch.timeout_secs, 3600);
        assert_eq!(config.fetch.max_attempts, Some(5));
        assert_eq!(config.fetch.outbox_capacity, 4);
        assert_eq!(config.refresh.interval_minutes, 60);
        assert_eq!(config.storage_path(), PathBuf::from("/tmp/iw/weather.db"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
