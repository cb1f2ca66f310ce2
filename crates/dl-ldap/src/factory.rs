//! Directory context construction.
//!
//! [`DirectoryContextFactory::build`] is a function of the current
//! configuration. A disabled or unaddressed directory is a normal outcome,
//! reported as [`BuildOutcome::Disabled`] without touching the network. A
//! failure to connect or bind with an enabled, addressed directory is an
//! error and is never downgraded to "disabled".

use std::fmt;
use std::sync::Arc;

use crate::config::DirectoryConnectionConfig;
use crate::connection::{DirectoryConnector, DirectoryContext};
use crate::error::LdapResult;

/// Why no directory connection exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    /// `ldap.enabled` is false or unset.
    NotEnabled,
    /// Directory login is enabled but `ldap.server` is missing or blank.
    ServerMissing,
    /// The last rebuild failed to connect or bind.
    ConnectionFailed,
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotEnabled => "not enabled",
            Self::ServerMissing => "server not specified",
            Self::ConnectionFailed => "connection failed",
        })
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub enum BuildOutcome {
    /// A bound connection.
    Connected(DirectoryContext),
    /// No connection, for a non-error reason.
    Disabled(DisabledReason),
}

/// Builds [`DirectoryContext`]s from configuration.
#[derive(Clone)]
pub struct DirectoryContextFactory {
    connector: Arc<dyn DirectoryConnector>,
}

impl DirectoryContextFactory {
    /// Creates a factory using `connector` for network I/O.
    #[must_use]
    pub fn new(connector: Arc<dyn DirectoryConnector>) -> Self {
        Self { connector }
    }

    /// Builds a context for `config`.
    ///
    /// ## Errors
    ///
    /// Returns a connection or bind error if the directory is enabled and
    /// addressed but cannot be reached or rejects the bind.
    pub fn build(&self, config: &DirectoryConnectionConfig) -> LdapResult<BuildOutcome> {
        if !config.enabled {
            tracing::info!("LDAP login is disabled");
            return Ok(BuildOutcome::Disabled(DisabledReason::NotEnabled));
        }

        let Some(env) = config.bind_environment() else {
            tracing::info!("LDAP server is not specified. LDAP login is disabled");
            return Ok(BuildOutcome::Disabled(DisabledReason::ServerMissing));
        };

        tracing::debug!(
            url = %env.provider_url,
            auth = env.authentication.mode(),
            principal = env.authentication.principal().unwrap_or(""),
            "Connecting to LDAP server"
        );

        let connection = self.connector.connect(&env)?;
        Ok(BuildOutcome::Connected(DirectoryContext::new(&env, connection)))
    }
}

impl fmt::Debug for DirectoryContextFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryContextFactory").finish_non_exhaustive()
    }
}
