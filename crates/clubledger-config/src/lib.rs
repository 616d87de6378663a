//! Configuration management for clubledger
//!
//! Loads, validates and exposes the clubledger configuration from a YAML
//! file. The resulting [`Config`] is passed explicitly into the backend
//! client and the API server at startup.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigResult};

// ==================== Configuration Types ====================

/// Remote backend of record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST backend, e.g. "https://club.example.com/api"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout in seconds; the transport default applies when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

/// Local JSON API server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Finance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceConfig {
    /// Invoice tax rate in whole percent
    #[serde(default = "default_tax_rate_percent")]
    pub tax_rate_percent: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Date range applied to the transaction list when none is requested
    #[serde(default)]
    pub default_range: TimeRange,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: default_tax_rate_percent(),
            currency: default_currency(),
            decimal_places: default_decimal_places(),
            default_range: TimeRange::default(),
        }
    }
}

fn default_tax_rate_percent() -> u32 {
    10
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Time range enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// Current month
    Month,
    /// Current calendar quarter
    Quarter,
    /// Current year
    Year,
    /// All time
    All,
    /// Custom range
    Custom,
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::All
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" => Ok(TimeRange::Month),
            "quarter" => Ok(TimeRange::Quarter),
            "year" => Ok(TimeRange::Year),
            "all" => Ok(TimeRange::All),
            "custom" => Ok(TimeRange::Custom),
            _ => Err(format!("Invalid time range: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeRange::Month => write!(f, "month"),
            TimeRange::Quarter => write!(f, "quarter"),
            TimeRange::Year => write!(f, "year"),
            TimeRange::All => write!(f, "all"),
            TimeRange::Custom => write!(f, "custom"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub finance: FinanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::IoError {
            path: path.display().to_string(),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::InvalidYaml { message: e.to_string() })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        let base_url = self.backend.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "backend.base_url".to_string(),
                reason: "Base URL must start with http:// or https://".to_string(),
            });
        }

        if self.backend.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "backend.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0 or left unset".to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if self.finance.tax_rate_percent > 100 {
            return Err(ConfigError::InvalidValue {
                field: "finance.tax_rate_percent".to_string(),
                reason: "Tax rate must be between 0 and 100".to_string(),
            });
        }

        if self.finance.decimal_places > 10 {
            return Err(ConfigError::InvalidValue {
                field: "finance.decimal_places".to_string(),
                reason: "Decimal places must be between 0 and 10".to_string(),
            });
        }

        Ok(())
    }

    /// Default configuration file contents
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Backend base URL without a trailing slash
    pub fn backend_url(&self) -> &str {
        self.backend.base_url.trim().trim_end_matches('/')
    }

    /// Address the local API server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Default config path next to the working directory
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigErrorCode, ConfigErrorSeverity};

    #[test]
    fn test_default_template_parses() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        assert_eq!(config.finance.tax_rate_percent, 10);
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:5000/api");
        assert!(config.backend.token.is_none());
        assert_eq!(config.finance.currency, "USD");
        assert_eq!(config.finance.default_range, TimeRange::All);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_backend_url_trims_trailing_slash() {
        let config = Config::from_yaml("backend:\n  base_url: \"https://club.example.com/api/\"\n").unwrap();
        assert_eq!(config.backend_url(), "https://club.example.com/api");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = Config::from_yaml("backend:\n  base_url: \"club.example.com\"\n").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidValue);
        assert_eq!(err.to_details().field.as_deref(), Some("backend.base_url"));
    }

    #[test]
    fn test_tax_rate_out_of_range() {
        let err = Config::from_yaml("finance:\n  tax_rate_percent: 150\n").unwrap_err();
        assert!(err.to_string().contains("finance.tax_rate_percent"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Config::from_yaml("backend:\n  timeout_secs: 0\n").is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml("server: [unclosed").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidYaml);
        assert_eq!(err.severity(), ConfigErrorSeverity::Critical);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/definitely/not/here/config.yaml").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::FileNotFound);
        assert!(!err.to_details().suggestions.is_empty());
    }

    #[test]
    fn test_time_range_from_str() {
        assert_eq!("month".parse::<TimeRange>().unwrap(), TimeRange::Month);
        assert_eq!("QUARTER".parse::<TimeRange>().unwrap(), TimeRange::Quarter);
        assert!("decade".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::Year.to_string(), "year");
    }
}
