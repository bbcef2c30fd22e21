//! Application configuration loaded from environment variables.

use std::time::Duration;

use lifecycle::{DEFAULT_ORDER_TIMEOUT, LifecycleConfig};
use thiserror::Error;

/// A variable is set but cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `ORDER_TIMEOUT_SECS` — payment window for new orders (default: `1800`)
/// - `CURRENCY` — currency payments are expected in (default: `"RUB"`)
/// - `DATABASE_URL` — PostgreSQL connection string; unset keeps orders in memory
/// - `NOTIFY_WEBHOOK_URL` — relay for order notifications; unset logs them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub order_timeout: Duration,
    pub currency: String,
    pub database_url: Option<String>,
    pub notify_webhook_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError {
                name: "PORT",
                value,
            })?,
            None => defaults.port,
        };

        let order_timeout = match var("ORDER_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError {
                    name: "ORDER_TIMEOUT_SECS",
                    value,
                })?,
            None => defaults.order_timeout,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            order_timeout,
            currency: var("CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(defaults.currency),
            database_url: var("DATABASE_URL"),
            notify_webhook_url: var("NOTIFY_WEBHOOK_URL"),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig::with_order_timeout(self.order_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            order_timeout: DEFAULT_ORDER_TIMEOUT,
            currency: "RUB".to_string(),
            database_url: None,
            notify_webhook_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.order_timeout, Duration::from_secs(1800));
        assert_eq!(config.currency, "RUB");
        assert!(config.database_url.is_none());
        assert!(config.notify_webhook_url.is_none());
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        assert_eq!(from_vars(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = from_vars(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("RUST_LOG", "debug"),
            ("ORDER_TIMEOUT_SECS", "60"),
            ("CURRENCY", "usd"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("NOTIFY_WEBHOOK_URL", "http://relay/notify"),
        ])
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.lifecycle().order_timeout, Duration::from_secs(60));
        assert_eq!(config.currency, "USD");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(
            config.notify_webhook_url.as_deref(),
            Some("http://relay/notify")
        );
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = from_vars(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert_eq!(
            from_vars(&[("PORT", "eighty")]).unwrap_err(),
            ConfigError {
                name: "PORT",
                value: "eighty".to_string()
            }
        );
        assert_eq!(
            from_vars(&[("ORDER_TIMEOUT_SECS", "-5")]).unwrap_err().name,
            "ORDER_TIMEOUT_SECS"
        );
    }

    #[test]
    fn test_addr_default() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }
}
