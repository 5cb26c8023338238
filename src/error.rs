//! Error types for the flag engine.
//!
//! The evaluation core is error-transparent: store and gate failures surface
//! exactly as their implementations produced them. A missing flag is not an
//! error at all; it evaluates to `false`.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the flag engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Failure reported by a flag store (connectivity, timeout, malformed data)
    #[error("Flag store error: {message}")]
    Store {
        /// Detailed error message
        message: String,
        /// Flag being fetched, if applicable
        flag: Option<String>,
    },

    /// Failure raised by an expiration gate
    #[error("Expiration gate error: {message}")]
    Gate {
        /// Detailed error message
        message: String,
        /// Flag the gate was consulted for
        flag: Option<String>,
    },

    /// Flag or configuration validation error
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
        /// Field that caused the error, if applicable
        field: Option<String>,
    },

    /// Cache backend error
    #[error("Cache error: {message}")]
    Cache {
        /// Detailed error message
        message: String,
        /// Cache key that caused the error
        key: Option<String>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error (unexpected condition)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

impl Error {
    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Error::Store {
            message: message.into(),
            flag: None,
        }
    }

    /// Create a store error naming the flag that was being fetched.
    pub fn store_for_flag(message: impl Into<String>, flag: impl Into<String>) -> Self {
        Error::Store {
            message: message.into(),
            flag: Some(flag.into()),
        }
    }

    /// Create a gate error.
    pub fn gate(message: impl Into<String>) -> Self {
        Error::Gate {
            message: message.into(),
            flag: None,
        }
    }

    /// Create a gate error naming the flag being gated.
    pub fn gate_for_flag(message: impl Into<String>, flag: impl Into<String>) -> Self {
        Error::Gate {
            message: message.into(),
            flag: Some(flag.into()),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field context.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Error::Cache {
            message: message.into(),
            key: None,
        }
    }

    /// Create a cache error with key context.
    pub fn cache_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Cache {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error with key context.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Store and cache failures are usually transient; whether to fail open
    /// or closed on them is left to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Store { .. } | Error::Cache { .. })
    }

    /// Get the error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Store { .. } => "store",
            Error::Gate { .. } => "gate",
            Error::Validation { .. } => "validation",
            Error::Cache { .. } => "cache",
            Error::Config { .. } => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Yaml(_) => "yaml",
            Error::Internal { .. } => "internal",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => {
                Error::config_key("missing configuration value", key)
            }
            other => Error::config(other.to_string()),
        }
    }
}

#[cfg(feature = "redis-cache")]
impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::cache(err.to_string())
    }
}
