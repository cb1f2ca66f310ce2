//! LDAP-specific error types.
//!
//! ## Security Note
//!
//! Error messages must not leak sensitive information like bind
//! credentials. Variants carry the key name or the transport's own error
//! text, never a configured password.
//!
//! "Not configured" is not an error: it is reported as
//! [`DisabledReason`](crate::factory::DisabledReason).

use thiserror::Error;

/// LDAP-specific errors.
#[derive(Debug, Error)]
pub enum LdapError {
    /// A required or numeric configuration field is malformed.
    #[error("LDAP configuration error: invalid `{key}`: {reason}")]
    ConfigParse {
        /// The offending property key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The transport to the directory server could not be established.
    #[error("LDAP connection to {url} failed: {reason}")]
    Connection {
        /// Provider URL the connection was attempted against.
        url: String,
        /// Underlying cause.
        reason: String,
    },

    /// The server rejected the bind.
    #[error("LDAP bind failed: {0}")]
    Bind(String),

    /// Search operation failed.
    #[error("LDAP search failed: {0}")]
    Search(String),

    /// The context has been closed and can no longer be used.
    #[error("LDAP context is closed")]
    Closed,

    /// The holder has been shut down and no longer rebuilds.
    #[error("LDAP context holder is shut down")]
    ShutDown,

    /// Underlying ldap3 error.
    #[error("LDAP error: {0}")]
    Ldap3(#[from] ldap3::LdapError),
}

impl LdapError {
    /// Creates a configuration parse error.
    #[must_use]
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigParse {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a bind error.
    #[must_use]
    pub fn bind(msg: impl Into<String>) -> Self {
        Self::Bind(msg.into())
    }

    /// Creates a search error.
    #[must_use]
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Bind(_) | Self::Ldap3(_))
    }

    /// Checks if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigParse { .. })
    }
}

impl From<dl_core::Error> for LdapError {
    fn from(err: dl_core::Error) -> Self {
        match err {
            dl_core::Error::InvalidValue { key, reason } => Self::ConfigParse { key, reason },
            other => Self::ConfigParse {
                key: "ldap".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result type for LDAP operations.
pub type LdapResult<T> = Result<T, LdapError>;
