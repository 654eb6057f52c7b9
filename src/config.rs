//! Configuration management for the travel optimizer
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TravelOptimizerError;
use crate::models::{DEFAULT_TOP_N, PlanOptions, Weights};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ENV_PREFIX: &str = "TRAVEL_OPTIMIZER";
const APP_DIR: &str = "travel-optimizer";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Route provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Provider fan-out settings
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default search settings used by the CLI
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub mock: MockConfig,
    #[serde(default)]
    pub flight_api: FlightApiConfig,
    #[serde(default)]
    pub ground_transport: GroundTransportConfig,
}

/// Bundled or file-backed sample routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON dataset replacing the bundled sample routes
    pub data_path: Option<PathBuf>,
}

/// Flight search API settings. Enabled only when key and secret are both set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightApiConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    #[serde(default = "default_flight_api_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Upper bound on offers requested per search
    #[serde(default = "default_max_offers")]
    pub max_offers: u32,
}

/// Train and bus search API settings. Enabled only when a key is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTransportConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_ground_transport_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Upper bound on a single provider call, retries included
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub required_bags: u32,
    #[serde(default = "default_weight")]
    pub weight_time: f64,
    #[serde(default = "default_weight")]
    pub weight_cost: f64,
    #[serde(default = "default_weight")]
    pub weight_convenience: f64,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_flight_api_base_url() -> String {
    "https://test.api.amadeus.com".to_string()
}

fn default_ground_transport_base_url() -> String {
    "https://api.omio.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_offers() -> u32 {
    20
}

fn default_adapter_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_weight() -> f64 {
    1.0
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_path: None,
        }
    }
}

impl Default for FlightApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: default_flight_api_base_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            max_offers: default_max_offers(),
        }
    }
}

impl Default for GroundTransportConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ground_transport_base_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_seconds: default_adapter_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            max_connections: None,
            required_bags: 0,
            weight_time: default_weight(),
            weight_cost: default_weight(),
            weight_convenience: default_weight(),
        }
    }
}

impl DefaultsConfig {
    /// Search options seeded from these defaults
    #[must_use]
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            max_connections: self.max_connections,
            required_bags: self.required_bags,
            weight_time: self.weight_time,
            weight_cost: self.weight_cost,
            weight_convenience: self.weight_convenience,
            top_n: Some(self.top_n),
            ..PlanOptions::default()
        }
    }
}

impl OptimizerConfig {
    /// Load configuration from the default file location and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.or_else(Self::get_config_path);

        if let Some(config_file) = config_file.filter(|path| path.exists()) {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. TRAVEL_OPTIMIZER_PROVIDERS__FLIGHT_API__API_KEY
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: OptimizerConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.providers.flight_api.base_url.is_empty() {
            self.providers.flight_api.base_url = default_flight_api_base_url();
        }
        if self.providers.ground_transport.base_url.is_empty() {
            self.providers.ground_transport.base_url = default_ground_transport_base_url();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_weights()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        for (name, seconds) in [
            (
                "Flight API timeout",
                self.providers.flight_api.timeout_seconds,
            ),
            (
                "Ground transport timeout",
                self.providers.ground_transport.timeout_seconds,
            ),
            (
                "Aggregator adapter timeout",
                self.aggregator.adapter_timeout_seconds,
            ),
        ] {
            if !(1..=300).contains(&seconds) {
                return Err(TravelOptimizerError::configuration(format!(
                    "{name} must be between 1 and 300 seconds (got {seconds})"
                ))
                .into());
            }
        }

        for (name, retries) in [
            ("Flight API", self.providers.flight_api.max_retries),
            ("Ground transport", self.providers.ground_transport.max_retries),
        ] {
            if retries > 10 {
                return Err(TravelOptimizerError::configuration(format!(
                    "{name} max retries cannot exceed 10"
                ))
                .into());
            }
        }

        if !(1..=250).contains(&self.providers.flight_api.max_offers) {
            return Err(TravelOptimizerError::configuration(
                "Flight API max_offers must be between 1 and 250",
            )
            .into());
        }

        if !(1..=100).contains(&self.defaults.top_n) {
            return Err(
                TravelOptimizerError::configuration("Default top_n must be between 1 and 100").into(),
            );
        }

        Ok(())
    }

    fn validate_weights(&self) -> Result<()> {
        Weights::new(
            self.defaults.weight_time,
            self.defaults.weight_cost,
            self.defaults.weight_convenience,
        )
        .validate()?;
        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelOptimizerError::configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelOptimizerError::configuration(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Flight API", &self.providers.flight_api.base_url),
            ("Ground transport", &self.providers.ground_transport.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TravelOptimizerError::configuration(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = OptimizerConfig::default();
        assert!(config.providers.mock.enabled);
        assert!(config.providers.flight_api.api_key.is_none());
        assert_eq!(config.providers.flight_api.timeout_seconds, 30);
        assert_eq!(config.aggregator.adapter_timeout_seconds, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.defaults.top_n, DEFAULT_TOP_N);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            [providers.mock]
            enabled = false

            [providers.flight_api]
            api_key = "key"
            api_secret = "secret"
            max_offers = 5

            [aggregator]
            adapter_timeout_seconds = 10

            [logging]
            format = "json"
            "#,
        );

        let config = OptimizerConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert!(!config.providers.mock.enabled);
        assert_eq!(config.providers.flight_api.api_key.as_deref(), Some("key"));
        assert_eq!(config.providers.flight_api.max_offers, 5);
        assert_eq!(
            config.providers.flight_api.base_url,
            "https://test.api.amadeus.com"
        );
        assert_eq!(config.aggregator.adapter_timeout_seconds, 10);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            OptimizerConfig::load_from_path(Some(PathBuf::from("/nonexistent/config.toml")))
                .unwrap();
        assert!(config.providers.mock.enabled);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let file = write_config(
            r#"
            [aggregator]
            adapter_timeout_seconds = 0
            "#,
        );
        let err = OptimizerConfig::load_from_path(Some(file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("between 1 and 300"));
        assert!(
            err.downcast_ref::<TravelOptimizerError>()
                .is_some_and(TravelOptimizerError::is_configuration)
        );
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = OptimizerConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = OptimizerConfig::default();
        config.providers.flight_api.timeout_seconds = 500;
        assert!(config.validate().is_err());

        let mut config = OptimizerConfig::default();
        config.providers.ground_transport.max_retries = 11;
        assert!(config.validate().is_err());

        let mut config = OptimizerConfig::default();
        config.defaults.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_weights() {
        let mut config = OptimizerConfig::default();
        config.defaults.weight_cost = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_base_url() {
        let mut config = OptimizerConfig::default();
        config.providers.ground_transport.base_url = "ftp://example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HTTP or HTTPS"));
    }

    #[test]
    fn test_environment_variable_override() {
        // SAFETY: no other test reads this variable
        unsafe {
            env::set_var("TRAVEL_OPTIMIZER_PROVIDERS__GROUND_TRANSPORT__API_KEY", "env-key");
        }

        let result =
            OptimizerConfig::load_from_path(Some(PathBuf::from("/nonexistent/config.toml")));

        // SAFETY: Test cleanup
        unsafe {
            env::remove_var("TRAVEL_OPTIMIZER_PROVIDERS__GROUND_TRANSPORT__API_KEY");
        }

        let config = result.unwrap();
        assert_eq!(
            config.providers.ground_transport.api_key.as_deref(),
            Some("env-key")
        );
    }

    #[test]
    fn test_defaults_seed_plan_options() {
        let mut config = OptimizerConfig::default();
        config.defaults.max_connections = Some(1);
        config.defaults.weight_cost = 3.0;

        let options = config.defaults.plan_options();
        assert_eq!(options.max_connections, Some(1));
        assert_eq!(options.weight_cost, 3.0);
        assert_eq!(options.top_n, Some(DEFAULT_TOP_N));
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = OptimizerConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("travel-optimizer"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
