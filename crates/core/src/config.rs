use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Locale used by localized content types that do not set their own.
    pub default_locale: String,
    /// `findPage` page size when the caller omits one.
    pub default_page_size: usize,
    /// Upper bound for `pageSize` and `limit`.
    pub max_page_size: usize,
    /// Lifecycle event channel capacity.
    pub event_bus_capacity: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

impl ServiceConfig {
    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            default_locale: env::var("DEFAULT_LOCALE").unwrap_or(defaults.default_locale),
            default_page_size: parse_var("DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: parse_var("MAX_PAGE_SIZE", defaults.max_page_size)?,
            event_bus_capacity: parse_var("EVENT_BUS_CAPACITY", defaults.event_bus_capacity)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };
        if config.default_page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_PAGE_SIZE",
                value: "0".to_string(),
            });
        }
        if config.max_page_size < config.default_page_size {
            return Err(ConfigError::Invalid {
                key: "MAX_PAGE_SIZE",
                value: config.max_page_size.to_string(),
            });
        }
        Ok(config)
    }

    /// Clamp a requested page size into `1..=max_page_size`.
    pub fn clamp_page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            default_page_size: 25,
            max_page_size: 100,
            event_bus_capacity: 1024,
            log_level: "info".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}
