use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Prefix for environment overrides, e.g. `METEOPIN__WIDGETS__CACHE_MINUTES=30`.
const ENV_PREFIX: &str = "METEOPIN";
const ENV_SEPARATOR: &str = "__";

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

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
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

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Widget cache and storage settings
    #[serde(default)]
    pub widgets: WidgetsConfig,

    /// Map collaborator settings
    #[serde(default)]
    pub map: MapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the Open-Meteo compatible endpoint
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Per-request timeout. Unset means the HTTP client's default (none).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl WeatherConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetsConfig {
    /// How long fetched weather stays fresh, in minutes (default: 60)
    #[serde(default = "default_cache_minutes")]
    pub cache_minutes: u32,

    /// Two pins closer than this on both axes are duplicates (degrees)
    #[serde(default = "default_duplicate_tolerance")]
    pub duplicate_tolerance: f64,

    /// Directory holding the persisted widget list
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_cache_minutes() -> u32 {
    60
}

fn default_duplicate_tolerance() -> f64 {
    0.001
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meteopin")
}

impl Default for WidgetsConfig {
    fn default() -> Self {
        Self {
            cache_minutes: default_cache_minutes(),
            duplicate_tolerance: default_duplicate_tolerance(),
            data_dir: default_data_dir(),
        }
    }
}

impl WidgetsConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_minutes) * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Bounded wait for the map collaborator to become ready
    #[serde(default = "default_init_timeout_secs")]
    pub init_timeout_secs: u64,

    /// Zoom used for the overview of all markers
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    /// Zoom used when focusing a single widget
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: u8,
}

fn default_init_timeout_secs() -> u64 {
    5
}

fn default_zoom() -> u8 {
    10
}

fn default_focus_zoom() -> u8 {
    12
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            init_timeout_secs: default_init_timeout_secs(),
            default_zoom: default_zoom(),
            focus_zoom: default_focus_zoom(),
        }
    }
}

impl MapConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meteopin");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            widgets: WidgetsConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path` with environment overrides applied.
    ///
    /// Writes a default file first when `path` does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).format(config::FileFormat::Toml))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()
            .context("Failed to read config file")?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings
    /// are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.request_timeout_secs == Some(0) {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0 (omit it to use the client default)",
            );
        }

        if self.widgets.cache_minutes == 0 {
            result.add_warning(
                "widgets.cache_minutes",
                "Weather cache disabled (0 minutes); every start refetches all widgets",
            );
        } else if self.widgets.cache_minutes > 1440 {
            result.add_warning(
                "widgets.cache_minutes",
                "Weather cache is longer than 24 hours",
            );
        }

        let tolerance = self.widgets.duplicate_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            result.add_error(
                "widgets.duplicate_tolerance",
                "Duplicate tolerance must be a non-negative number",
            );
        } else if tolerance > 1.0 {
            result.add_warning(
                "widgets.duplicate_tolerance",
                "Duplicate tolerance above 1 degree rejects pins many kilometres apart",
            );
        }

        if self.map.init_timeout_secs == 0 {
            result.add_error("map.init_timeout_secs", "Map init timeout must be greater than 0");
        }

        if self.map.focus_zoom < self.map.default_zoom {
            result.add_warning(
                "map.focus_zoom",
                "Focus zoom is wider than the overview zoom",
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

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("meteopin");

        Ok(config_dir.join("config.toml"))
    }
}
