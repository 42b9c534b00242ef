//! Service configuration.
//!
//! Read once at process start and handed to every component by reference.
//! There is no runtime reconfiguration.

use crate::LicenseLogError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP port when `PORT` is unset or unparseable.
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of pooled read-only store connections.
pub const DEFAULT_READ_CONNECTIONS: usize = 4;

/// Upper bound on pooled read-only store connections.
pub const MAX_READ_CONNECTIONS: usize = 64;

/// Configuration for the license log service.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Bind host (e.g., "0.0.0.0").
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Debug mode. Enables the db-status endpoint.
    pub debug: bool,

    /// Shared secret expected in the `X-API-Key` header.
    pub api_key: String,

    /// SQLite database file.
    pub db_path: PathBuf,

    /// Deadline applied to every store call made on behalf of a request.
    pub request_timeout: Duration,

    /// Idle read-only connections kept for file-backed stores.
    pub read_connections: usize,
}

impl LoggerConfig {
    /// Build a configuration with defaults for everything except the secret.
    pub fn new(api_key: impl Into<String>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            debug: false,
            api_key: api_key.into(),
            db_path: db_path.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            read_connections: DEFAULT_READ_CONNECTIONS,
        }
    }

    /// Read configuration from the process environment.
    ///
    /// Recognized variables: `HOST`, `PORT`, `DEBUG`, `API_KEY`,
    /// `LOG_DB_PATH`, `REQUEST_TIMEOUT_MS`, `DB_READ_CONNECTIONS`.
    pub fn from_env() -> Result<Self, LicenseLogError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LicenseLogError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("API_KEY").ok_or_else(|| {
            LicenseLogError::ConfigError("API_KEY must be set".to_string())
        })?;

        let db_path = match lookup("LOG_DB_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_db_path()?,
        };

        let mut config = Self::new(api_key, db_path);

        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host;
        }
        config.port = lookup("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        config.debug = lookup("DEBUG")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        if let Some(ms) = lookup("REQUEST_TIMEOUT_MS") {
            let ms = ms.trim().parse::<u64>().map_err(|_| {
                LicenseLogError::ConfigError(format!("REQUEST_TIMEOUT_MS is not a number: {}", ms))
            })?;
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = lookup("DB_READ_CONNECTIONS").and_then(|v| v.trim().parse().ok()) {
            config.read_connections = n;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), LicenseLogError> {
        if self.api_key.is_empty() {
            return Err(LicenseLogError::ConfigError(
                "api_key cannot be empty".to_string(),
            ));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(LicenseLogError::ConfigError(
                "db_path cannot be empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(LicenseLogError::ConfigError(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.read_connections > MAX_READ_CONNECTIONS {
            return Err(LicenseLogError::ConfigError(format!(
                "read_connections must be at most {} (got {})",
                MAX_READ_CONNECTIONS, self.read_connections
            )));
        }
        Ok(())
    }

    /// Socket address string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `<data_dir>/licenselog/license_logs.db`, falling back to the home directory.
fn default_db_path() -> Result<PathBuf, LicenseLogError> {
    let base = dirs::data_dir()
        .map(|d| d.join("licenselog"))
        .or_else(dirs::home_dir)
        .ok_or_else(|| {
            LicenseLogError::ConfigError("Could not find a data directory for LOG_DB_PATH".to_string())
        })?;
    Ok(base.join("license_logs.db"))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config =
            LoggerConfig::from_lookup(lookup_from(&[("API_KEY", "secret"), ("LOG_DB_PATH", "/tmp/x.db")]))
                .unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = LoggerConfig::from_lookup(lookup_from(&[
            ("API_KEY", "secret"),
            ("LOG_DB_PATH", "/tmp/x.db"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9090"),
            ("DEBUG", "True"),
            ("REQUEST_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert!(config.debug);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = LoggerConfig::from_lookup(lookup_from(&[
            ("API_KEY", "secret"),
            ("LOG_DB_PATH", "/tmp/x.db"),
            ("PORT", "eighty"),
        ]))
        .unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_missing_api_key() {
        let result = LoggerConfig::from_lookup(lookup_from(&[("LOG_DB_PATH", "/tmp/x.db")]));
        assert!(matches!(result, Err(LicenseLogError::ConfigError(_))));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let config = LoggerConfig::new("", "/tmp/x.db");
        assert!(matches!(
            config.validate(),
            Err(LicenseLogError::ConfigError(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = LoggerConfig::from_lookup(lookup_from(&[
            ("API_KEY", "secret"),
            ("LOG_DB_PATH", "/tmp/x.db"),
            ("REQUEST_TIMEOUT_MS", "0"),
        ]));
        assert!(matches!(result, Err(LicenseLogError::ConfigError(_))));
    }

    #[test]
    fn test_oversized_reader_pool_rejected() {
        let mut config = LoggerConfig::new("secret", "/tmp/x.db");
        config.read_connections = MAX_READ_CONNECTIONS + 1;
        assert!(matches!(
            config.validate(),
            Err(LicenseLogError::ConfigError(_))
        ));
    }
}
