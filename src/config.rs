//! Runtime configuration, built once at startup.

use std::fmt;
use std::time::Duration;

use crate::storage::DEFAULT_CAPACITY;

/// Default render (and HTTP poll) interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default Datadog query cadence.
pub const DEFAULT_DATADOG_POLL: Duration = Duration::from_secs(10);

/// Default Datadog API endpoint.
pub const DEFAULT_DATADOG_URL: &str = "https://api.datadoghq.com";

/// Which metric source feeds the store, with its connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Poll an expvar-style JSON endpoint.
    Http { url: String },
    /// Query the Datadog metrics API.
    Datadog {
        api_key: String,
        app_key: String,
        base_url: String,
        poll_interval: Duration,
    },
    /// Read one JSON object per line from standard input.
    Stdin,
}

impl SourceConfig {
    pub fn name(&self) -> &'static str {
        match self {
            SourceConfig::Http { .. } => "http",
            SourceConfig::Datadog { .. } => "datadog",
            SourceConfig::Stdin => "stdin",
        }
    }
}

/// Immutable configuration passed to the store, the source and the tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Points retained per field.
    pub retention: usize,
    /// Render cadence; also the HTTP poll cadence.
    pub interval: Duration,
    pub source: SourceConfig,
}

impl Config {
    /// Builds a validated configuration.
    pub fn new(
        retention: usize,
        interval: Duration,
        source: SourceConfig,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            retention,
            interval,
            source,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration with default retention and interval.
    pub fn with_source(source: SourceConfig) -> Result<Self, ConfigError> {
        Self::new(DEFAULT_CAPACITY, DEFAULT_INTERVAL, source)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retention == 0 {
            return Err(ConfigError::InvalidRetention);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }

        match &self.source {
            SourceConfig::Http { url } => validate_url(url),
            SourceConfig::Datadog {
                api_key,
                app_key,
                base_url,
                poll_interval,
            } => {
                if api_key.trim().is_empty() {
                    return Err(ConfigError::MissingCredential("api key"));
                }
                if app_key.trim().is_empty() {
                    return Err(ConfigError::MissingCredential("application key"));
                }
                if poll_interval.is_zero() {
                    return Err(ConfigError::InvalidInterval);
                }
                validate_url(base_url)
            }
            SourceConfig::Stdin => Ok(()),
        }
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));

    match rest {
        Some(rest) if !rest.trim().is_empty() && !rest.contains(char::is_whitespace) => Ok(()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}

/// Startup configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidRetention,
    InvalidInterval,
    InvalidUrl(String),
    MissingCredential(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRetention => write!(f, "number of points must be at least 1"),
            ConfigError::InvalidInterval => write!(f, "interval must be greater than zero"),
            ConfigError::InvalidUrl(url) => write!(f, "invalid URL: '{}'", url),
            ConfigError::MissingCredential(what) => write!(f, "missing {}", what),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn datadog(api_key: &str, app_key: &str) -> SourceConfig {
        SourceConfig::Datadog {
            api_key: api_key.to_string(),
            app_key: app_key.to_string(),
            base_url: DEFAULT_DATADOG_URL.to_string(),
            poll_interval: DEFAULT_DATADOG_POLL,
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::with_source(SourceConfig::Stdin).unwrap();
        assert_eq!(config.retention, 100);
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.source.name(), "stdin");
    }

    #[test]
    fn test_zero_retention_or_interval_rejected() {
        assert_eq!(
            Config::new(0, DEFAULT_INTERVAL, SourceConfig::Stdin).unwrap_err(),
            ConfigError::InvalidRetention
        );
        assert_eq!(
            Config::new(10, Duration::ZERO, SourceConfig::Stdin).unwrap_err(),
            ConfigError::InvalidInterval
        );
    }

    #[test]
    fn test_http_url_validation() {
        let ok = |url: &str| {
            Config::with_source(SourceConfig::Http {
                url: url.to_string(),
            })
        };
        assert!(ok("http://localhost:8123/debug/vars").is_ok());
        assert!(ok("https://example.com/vars").is_ok());
        assert_eq!(ok("").unwrap_err(), ConfigError::InvalidUrl(String::new()));
        assert!(ok("ftp://example.com").is_err());
        assert!(ok("http://").is_err());
        assert!(ok("localhost:8080").is_err());
    }

    #[test]
    fn test_datadog_requires_credentials() {
        assert!(Config::with_source(datadog("key", "app")).is_ok());
        assert_eq!(
            Config::with_source(datadog("", "app")).unwrap_err(),
            ConfigError::MissingCredential("api key")
        );
        assert_eq!(
            Config::with_source(datadog("key", "  ")).unwrap_err(),
            ConfigError::MissingCredential("application key")
        );
    }
}
