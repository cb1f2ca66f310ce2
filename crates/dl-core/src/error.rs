//! Error handling for configuration access.
//!
//! Error messages name the offending key but never echo the value, so a
//! mistyped secret cannot end up in a log line.

use thiserror::Error;

/// Result type alias using the configuration error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or reading configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A key holds a value that cannot be interpreted.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// The offending property key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("failed to parse configuration file: {0}")]
    Parse(String),
}

impl Error {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns the property key this error refers to, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { key, .. } => Some(key),
            _ => None,
        }
    }
}
