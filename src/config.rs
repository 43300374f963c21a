//! Configuration management with serde serialization/deserialization
//!
//! Settings come from three layers, applied in order: an optional JSON file,
//! environment variables (a `.env` file is honoured when present), and finally
//! command-line overrides.

use crate::LinkCheckError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the link checker
///
/// # Examples
///
/// ```rust
/// use linkchecker::Config;
///
/// let config = Config {
///     worker_count: 16,
///     ..Default::default()
/// };
/// assert_eq!(config.server.port, 8080);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Number of concurrent probe workers per batch (default: 4)
    ///
    /// A batch never starts more workers than it has unique URLs.
    pub worker_count: usize,

    /// Settings for the single-URL availability probe
    pub probe: ProbeConfig,

    /// HTTP API settings
    pub server: ServerConfig,

    /// Snapshot persistence
    pub storage: StorageConfig,

    /// Log level and optional log file
    pub logging: LoggingConfig,

    /// Port for the Prometheus exporter; disabled when unset
    pub metrics_port: Option<u16>,
}

pub const DEFAULT_WORKER_COUNT: usize = 4;

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            probe: ProbeConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            metrics_port: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Upper bound for a single HEAD request (default: 5 seconds)
    pub timeout: Duration,

    /// User-Agent header sent with every probe
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: "WebStatusChecker/1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Deadline applied to every API request (default: 30 seconds)
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshot file loaded at startup and written on shutdown
    pub file_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("storage/links.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of debug, info, warn, error (default: info)
    pub level: String,

    /// Mirror log output into this file when set
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
        }
    }
}

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

impl Config {
    pub fn from_json(content: &str) -> Result<Self, LinkCheckError> {
        serde_json::from_str(content)
            .map_err(|e| LinkCheckError::Configuration(format!("invalid config file: {e}")))
    }

    /// Applies environment overrides on top of the current values.
    pub fn apply_env(&mut self) -> Result<(), LinkCheckError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::apply_env`] with an injectable lookup, used by tests.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), LinkCheckError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| LinkCheckError::Configuration(format!("PORT: {e}")))?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT") {
            self.server.request_timeout = Duration::from_secs(parse_positive("REQUEST_TIMEOUT", &secs)?);
        }
        if let Some(secs) = get("PROBE_TIMEOUT") {
            self.probe.timeout = Duration::from_secs(parse_positive("PROBE_TIMEOUT", &secs)?);
        }
        if let Some(workers) = get("MAX_WORKERS_NUM") {
            self.worker_count = parse_positive("MAX_WORKERS_NUM", &workers)? as usize;
        }
        if let Some(path) = get("FILE_STORAGE_PATH") {
            self.storage.file_path = PathBuf::from(path);
        }
        if let Some(level) = get("LEVEL_INFO") {
            self.logging.level = level;
        }
        if let Some(path) = get("LOGGING_PATH") {
            self.logging.file_path = Some(PathBuf::from(path));
        }

        Ok(())
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64, LinkCheckError> {
    let parsed: u64 = value
        .parse()
        .map_err(|e| LinkCheckError::Configuration(format!("failed to convert {key} to int: {e}")))?;
    if parsed == 0 {
        return Err(LinkCheckError::Configuration(format!(
            "{key} must be positive, got: {parsed}"
        )));
    }
    Ok(parsed)
}

pub fn validate_config(config: &Config) -> Result<(), LinkCheckError> {
    if config.worker_count == 0 {
        return Err(LinkCheckError::Configuration(
            "Worker count must be greater than 0".to_string(),
        ));
    }

    if config.probe.timeout.is_zero() {
        return Err(LinkCheckError::Configuration(
            "Probe timeout must be greater than 0".to_string(),
        ));
    }

    if config.server.request_timeout.is_zero() {
        return Err(LinkCheckError::Configuration(
            "Request timeout must be greater than 0".to_string(),
        ));
    }

    if config.server.host.trim().is_empty() {
        return Err(LinkCheckError::Configuration("Host must not be empty".to_string()));
    }

    if config.server.port == 0 {
        return Err(LinkCheckError::Configuration("Port must not be 0".to_string()));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(LinkCheckError::Configuration(format!(
            "Unknown log level '{}', expected one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.probe.timeout, Duration::from_secs(5));
        assert_eq!(config.server.bind_addr(), "localhost:8080");
        assert_eq!(config.server.request_timeout, Duration::from_secs(30));
        assert_eq!(config.storage.file_path, PathBuf::from("storage/links.json"));
        assert_eq!(config.logging.level, "info");
        assert!(config.metrics_port.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"worker_count": 12, "server": {"port": 9000}}"#).unwrap();
        assert_eq!(config.worker_count, 12);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "localhost");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                ("HOST", "0.0.0.0"),
                ("PORT", "9090"),
                ("MAX_WORKERS_NUM", "8"),
                ("REQUEST_TIMEOUT", "15"),
                ("FILE_STORAGE_PATH", "/tmp/links.json"),
                ("LEVEL_INFO", "debug"),
            ]))
            .unwrap();

        assert_eq!(config.server.bind_addr(), "0.0.0.0:9090");
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.server.request_timeout, Duration::from_secs(15));
        assert_eq!(config.storage.file_path, PathBuf::from("/tmp/links.json"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_rejects_bad_numbers() {
        let mut config = Config::default();
        assert!(config.apply_vars(vars(&[("MAX_WORKERS_NUM", "zero")])).is_err());
        assert!(config.apply_vars(vars(&[("REQUEST_TIMEOUT", "0")])).is_err());
        assert!(config.apply_vars(vars(&[("PORT", "99999")])).is_err());
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_vars(vars(&[("HOST", "")])).unwrap();
        assert_eq!(config.server.host, "localhost");
    }

    #[test]
    fn test_validate_config() {
        let mut config = Config::default();
        config.worker_count = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.probe.timeout = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }
}
