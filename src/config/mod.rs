//! Configuration for the flag engine.
//!
//! Values are layered: built-in defaults, then an optional file, then
//! environment variables prefixed with `FLAG_ENGINE` using `__` between
//! sections (for example `FLAG_ENGINE__CACHE__TTL_SECS=60`).

use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FLAG_ENGINE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Evaluation cache settings
    pub cache: CacheConfig,
    /// Logging and metrics settings
    pub telemetry: TelemetryConfig,
}

/// Which cache backend the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// In-process TTL cache
    #[default]
    Memory,
    /// Shared Redis cache (requires the `redis-cache` feature)
    Redis,
}

/// Evaluation cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether evaluations are cached at all
    pub enabled: bool,
    /// Lifetime of a cached evaluation in seconds
    pub ttl_secs: u64,
    /// Cache backend
    pub backend: CacheBackendKind,
    /// Redis connection URL, required for the redis backend
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: crate::cache::DEFAULT_TTL.as_secs(),
            backend: CacheBackendKind::Memory,
            redis_url: None,
        }
    }
}

impl CacheConfig {
    /// Lifetime of a cached evaluation.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether evaluation counters are collected
    pub enabled: bool,
    /// Service name attached to log output
    pub service_name: String,
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "flag-engine".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from defaults and the environment.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration from a file, with environment overrides on top.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a string in the given format.
    pub fn from_content(content: &str, format: config::FileFormat) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(content, format))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for inconsistent values.
    pub fn validate(&self) -> Result<()> {
        self.validate_settings()?;
        self.validate_backend()
    }

    /// Everything except the backend selection, which does not apply when a
    /// cache backend is supplied directly.
    pub(crate) fn validate_settings(&self) -> Result<()> {
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(Error::config_key("Cache TTL must be greater than zero", "cache.ttl_secs"));
        }

        if self.telemetry.service_name.is_empty() {
            return Err(Error::config_key(
                "Service name cannot be empty",
                "telemetry.service_name",
            ));
        }

        Ok(())
    }

    fn validate_backend(&self) -> Result<()> {
        if self.cache.enabled && self.cache.backend == CacheBackendKind::Redis {
            if !cfg!(feature = "redis-cache") {
                return Err(Error::config_key(
                    "Redis cache backend requires the redis-cache feature",
                    "cache.backend",
                ));
            }
            if self.cache.redis_url.is_none() {
                return Err(Error::config_key(
                    "Redis cache backend requires a URL",
                    "cache.redis_url",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_str() {
        let config = Config::from_content(
            "cache:\n  ttl_secs: 60\ntelemetry:\n  json_logs: true\n",
            FileFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.cache.enabled);
        assert!(config.telemetry.json_logs);
        assert_eq!(config.telemetry.service_name, "flag-engine");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = Config::from_content("cache:\n  ttl_secs: 0\n", FileFormat::Yaml).unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("cache.ttl_secs")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_redis_requires_url() {
        let mut config = Config::default();
        config.cache.backend = CacheBackendKind::Redis;
        assert!(config.validate().is_err());
        assert!(config.validate_settings().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flag-engine.toml");
        std::fs::write(&path, "[cache]\nenabled = false\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(!config.cache.enabled);
    }
}
