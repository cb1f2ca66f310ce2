//! Directory connection configuration.
//!
//! [`DirectoryConnectionConfig`] is built once per rebuild from the
//! string-keyed [`Properties`] by enumerating the `ldap.*` keys below. It is
//! the only input to the connection, the search policy and the attribute
//! keys.
//!
//! ## Security
//!
//! The manager password is kept as a [`SecretString`]. Neither this struct
//! nor [`BindEnvironment`] ever prints it.

use std::fmt;
use std::time::Duration;

use dl_core::Properties;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{LdapError, LdapResult};

/// Property keys read by this crate.
pub mod keys {
    /// Whether directory login is enabled (bool, default false).
    pub const ENABLED: &str = "ldap.enabled";
    /// Directory server URL, e.g. `ldap://host:389`.
    pub const SERVER: &str = "ldap.server";
    /// DN used for the manager bind.
    pub const MANAGER_DN: &str = "ldap.manager_dn";
    /// Password used for the manager bind.
    pub const MANAGER_PASSWORD: &str = "ldap.manager_password";
    /// Search time limit in milliseconds.
    pub const SEARCH_TIME_LIMIT: &str = "ldap.search_time_limit";
    /// Attribute holding the user display name.
    pub const USER_DISPLAY_NAME: &str = "ldap.user_display_name";
    /// Attribute holding the user email address.
    pub const USER_EMAIL: &str = "ldap.user_email";
    /// Base DN of the directory.
    pub const BASE_DN: &str = "ldap.base_dn";
    /// Base DN for user searches, relative to the base DN.
    pub const USER_SEARCH_BASE: &str = "ldap.user_search_base";
    /// User search filter template, e.g. `(uid={0})`.
    pub const USER_FILTER: &str = "ldap.user_filter";
    /// Connect timeout in milliseconds for the initial bind.
    pub const CONNECT_TIMEOUT: &str = "ldap.connect_timeout";
}

/// Typed view of the `ldap.*` configuration.
#[derive(Debug, Clone)]
pub struct DirectoryConnectionConfig {
    /// Whether directory login is enabled.
    pub enabled: bool,

    /// Directory server URL. Blank values are treated as absent.
    pub server_address: Option<String>,

    /// Manager DN for simple bind.
    pub manager_dn: Option<String>,

    /// Manager password for simple bind.
    pub manager_password: Option<SecretString>,

    /// Search time limit in milliseconds (0 means no limit).
    pub search_time_limit_ms: u32,

    /// Attribute holding the user display name.
    pub user_display_name_key: Option<String>,

    /// Attribute holding the user email address.
    pub user_email_key: Option<String>,

    /// Base DN, empty when unset.
    pub base_dn: String,

    /// User search base, empty when unset.
    pub user_search_base: String,

    /// User search filter template.
    pub user_filter: Option<String>,

    /// Connect timeout for the initial connection.
    pub connect_timeout: Option<Duration>,
}

impl DirectoryConnectionConfig {
    /// Builds the typed configuration from properties.
    ///
    /// ## Errors
    ///
    /// Returns [`LdapError::ConfigParse`] if `ldap.enabled` is not a boolean,
    /// or if `ldap.search_time_limit` is missing or not a non-negative integer,
    /// or if `ldap.connect_timeout` is set but not numeric.
    pub fn from_properties(props: &Properties) -> LdapResult<Self> {
        let enabled = props.get_bool(keys::ENABLED, false)?;

        let search_time_limit_ms = props
            .get_parsed::<u32>(keys::SEARCH_TIME_LIMIT)?
            .ok_or_else(|| LdapError::config(keys::SEARCH_TIME_LIMIT, "value is required"))?;

        let connect_timeout = props
            .get_parsed::<u64>(keys::CONNECT_TIMEOUT)?
            .map(Duration::from_millis);

        Ok(Self {
            enabled,
            server_address: props.get_non_blank(keys::SERVER).map(str::to_string),
            manager_dn: props.get(keys::MANAGER_DN).map(str::to_string),
            manager_password: props
                .get(keys::MANAGER_PASSWORD)
                .map(|p| SecretString::from(p.to_string())),
            search_time_limit_ms,
            user_display_name_key: props.get(keys::USER_DISPLAY_NAME).map(str::to_string),
            user_email_key: props.get(keys::USER_EMAIL).map(str::to_string),
            base_dn: props.get_or(keys::BASE_DN, "").to_string(),
            user_search_base: props.get_or(keys::USER_SEARCH_BASE, "").to_string(),
            user_filter: props.get(keys::USER_FILTER).map(str::to_string),
            connect_timeout,
        })
    }

    /// Derives the bind environment for this configuration.
    ///
    /// Returns `None` if there is no server address to connect to.
    #[must_use]
    pub fn bind_environment(&self) -> Option<BindEnvironment> {
        let provider_url = self.server_address.clone()?;

        let authentication = match (&self.manager_dn, &self.manager_password) {
            (Some(dn), Some(password))
                if !dn.is_empty() && !password.expose_secret().is_empty() =>
            {
                BindAuthentication::Simple {
                    principal: dn.clone(),
                    credentials: password.clone(),
                }
            }
            _ => BindAuthentication::None,
        };

        Some(BindEnvironment {
            provider_url,
            authentication,
            connect_timeout: self.connect_timeout,
        })
    }
}

/// How the connection authenticates to the directory server.
#[derive(Clone)]
pub enum BindAuthentication {
    /// Anonymous bind.
    None,

    /// Simple bind with a principal DN and password.
    Simple {
        /// DN to bind as.
        principal: String,
        /// Password for the principal.
        credentials: SecretString,
    },
}

impl BindAuthentication {
    /// Returns the authentication mode name.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Simple { .. } => "simple",
        }
    }

    /// Returns the principal DN, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Simple { principal, .. } => Some(principal),
        }
    }
}

impl fmt::Debug for BindAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Simple { principal, .. } => f
                .debug_struct("Simple")
                .field("principal", principal)
                .field("credentials", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Descriptor used to establish and bind a directory connection.
#[derive(Debug, Clone)]
pub struct BindEnvironment {
    /// Directory server URL.
    pub provider_url: String,

    /// Bind authentication.
    pub authentication: BindAuthentication,

    /// Optional connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl BindEnvironment {
    /// Creates an anonymous bind environment.
    #[must_use]
    pub fn anonymous(provider_url: impl Into<String>) -> Self {
        Self {
            provider_url: provider_url.into(),
            authentication: BindAuthentication::None,
            connect_timeout: None,
        }
    }

    /// Returns true if this environment binds anonymously.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self.authentication, BindAuthentication::None)
    }
}
