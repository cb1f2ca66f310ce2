//! Directory connections and the context handle that owns them.
//!
//! A [`DirectoryConnector`] turns a [`BindEnvironment`] into a bound
//! [`DirectoryConnection`]. The live connection is wrapped in a
//! [`DirectoryContext`], which is what gets published to readers. Once the
//! context is replaced it is closed: the session is unbound and any further
//! use fails with [`LdapError::Closed`].
//!
//! Connecting is blocking, so rebuilds can stay synchronous. Searching is
//! async and closing never blocks, so both are safe from async code.
//!
//! ## Security
//!
//! Bind credentials are only exposed at the moment of the bind call. They
//! are not retained by the connection or the context.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, SearchEntry, SearchOptions};
use parking_lot::{Mutex, RwLock};
use secrecy::ExposeSecret;
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::config::{BindAuthentication, BindEnvironment};
use crate::error::{LdapError, LdapResult};
use crate::search::{LdapEntry, SearchPolicy};

/// Establishes bound directory connections.
pub trait DirectoryConnector: Send + Sync {
    /// Connects to `env.provider_url` and binds as described by `env`.
    ///
    /// Blocks until the bind completes or fails.
    fn connect(&self, env: &BindEnvironment) -> LdapResult<Box<dyn DirectoryConnection>>;
}

/// A bound directory session.
#[async_trait]
pub trait DirectoryConnection: Send + Sync {
    /// Runs a search with the scope and limits of `policy`.
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
        policy: &SearchPolicy,
    ) -> LdapResult<Vec<LdapEntry>>;

    /// Releases the session. Must not block; searches already in flight
    /// may fail once the session is gone.
    fn close(&self) -> LdapResult<()>;
}

// ============================================================================
// ldap3 implementation
// ============================================================================

/// Connector backed by the async `ldap3` client.
///
/// Connection drivers and unbinds run as tasks on the runtime behind
/// `handle`.
#[derive(Debug, Clone)]
pub struct Ldap3Connector {
    handle: Handle,
}

impl Ldap3Connector {
    /// Creates a connector that drives its connections on `handle`.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    async fn open(&self, env: &BindEnvironment) -> LdapResult<Ldap> {
        let mut settings = LdapConnSettings::new();
        if let Some(timeout) = env.connect_timeout {
            settings = settings.set_conn_timeout(timeout);
        }

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &env.provider_url)
            .await
            .map_err(|e| LdapError::connection(&env.provider_url, e.to_string()))?;

        let url = env.provider_url.clone();
        self.handle.spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(url = %url, error = %e, "LDAP connection driver error");
            }
        });

        let bound = match &env.authentication {
            BindAuthentication::Simple {
                principal,
                credentials,
            } => ldap.simple_bind(principal, credentials.expose_secret()).await,
            BindAuthentication::None => ldap.simple_bind("", "").await,
        };

        if let Err(e) = bound.and_then(|res| res.success()) {
            // Best effort: the server may already have dropped the session.
            let _ = ldap.unbind().await;
            return Err(LdapError::bind(e.to_string()));
        }

        Ok(ldap)
    }
}

impl DirectoryConnector for Ldap3Connector {
    /// ## Panics
    ///
    /// Panics if called from within an async task. Run it on a blocking
    /// thread (`spawn_blocking`) or outside the runtime.
    fn connect(&self, env: &BindEnvironment) -> LdapResult<Box<dyn DirectoryConnection>> {
        let ldap = self.handle.block_on(self.open(env))?;
        Ok(Box::new(Ldap3Connection {
            ldap: Mutex::new(Some(ldap)),
            handle: self.handle.clone(),
        }))
    }
}

struct Ldap3Connection {
    ldap: Mutex<Option<Ldap>>,
    handle: Handle,
}

#[async_trait]
impl DirectoryConnection for Ldap3Connection {
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
        policy: &SearchPolicy,
    ) -> LdapResult<Vec<LdapEntry>> {
        // Each search runs on its own handle; options apply to one operation.
        let mut ldap = self.ldap.lock().clone().ok_or(LdapError::Closed)?;

        let options = SearchOptions::new()
            .timelimit(policy.time_limit_secs())
            .sizelimit(policy.size_limit());
        ldap.with_search_options(options);
        if let Some(limit) = policy.time_limit() {
            ldap.with_timeout(limit);
        }

        let (entries, _result) = ldap
            .search(base, policy.scope.to_ldap3(), filter, attrs.to_vec())
            .await
            .map_err(|e| LdapError::search(e.to_string()))?
            .success()
            .map_err(|e| LdapError::search(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(LdapEntry::from_search_entry)
            .collect())
    }

    fn close(&self) -> LdapResult<()> {
        if let Some(mut ldap) = self.ldap.lock().take() {
            self.handle.spawn(async move {
                if let Err(e) = ldap.unbind().await {
                    tracing::debug!(error = %e, "LDAP unbind failed");
                }
            });
        }
        Ok(())
    }
}

// ============================================================================
// Context handle
// ============================================================================

/// Live handle to an established directory connection.
///
/// Shared with readers behind an `Arc`. Searches run concurrently; closing
/// does not wait for them.
pub struct DirectoryContext {
    id: Uuid,
    provider_url: String,
    auth_mode: &'static str,
    connection: RwLock<Option<Arc<dyn DirectoryConnection>>>,
}

impl DirectoryContext {
    /// Wraps a freshly bound connection.
    #[must_use]
    pub fn new(env: &BindEnvironment, connection: Box<dyn DirectoryConnection>) -> Self {
        Self {
            id: Uuid::now_v7(),
            provider_url: env.provider_url.clone(),
            auth_mode: env.authentication.mode(),
            connection: RwLock::new(Some(Arc::from(connection))),
        }
    }

    /// Unique identifier of this context, for log correlation.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Directory server URL this context is connected to.
    #[must_use]
    pub fn provider_url(&self) -> &str {
        &self.provider_url
    }

    /// Authentication mode used for the bind (`none` or `simple`).
    #[must_use]
    pub const fn auth_mode(&self) -> &'static str {
        self.auth_mode
    }

    /// Returns true once the context has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.connection.read().is_none()
    }

    /// Runs a search on this context's connection.
    ///
    /// ## Errors
    ///
    /// Returns [`LdapError::Closed`] if the context has been replaced or shut
    /// down, or [`LdapError::Search`] if the search fails.
    pub async fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
        policy: &SearchPolicy,
    ) -> LdapResult<Vec<LdapEntry>> {
        let connection = self.connection.read().clone().ok_or(LdapError::Closed)?;
        connection.search(base, filter, attrs, policy).await
    }

    /// Closes the connection. Closing twice is a no-op.
    ///
    /// ## Errors
    ///
    /// Returns the error reported by the connection. The context is closed
    /// either way.
    pub fn close(&self) -> LdapResult<()> {
        let connection = self.connection.write().take();
        match connection {
            Some(connection) => {
                tracing::debug!(context_id = %self.id, url = %self.provider_url, "Closing LDAP context");
                connection.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for DirectoryContext {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(context_id = %self.id, error = %e, "Failed to close LDAP context");
        }
    }
}

impl fmt::Debug for DirectoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryContext")
            .field("id", &self.id)
            .field("provider_url", &self.provider_url)
            .field("auth_mode", &self.auth_mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}
