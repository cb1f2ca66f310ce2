//! Published directory state and the rebuild transaction.
//!
//! The [`DirectoryContextHolder`] owns the current [`DirectorySnapshot`]:
//! the directory connection together with the search policy and attribute
//! keys it was built with. A rebuild constructs a complete new snapshot and
//! swaps it in with one atomic pointer store, so readers on any thread see
//! either the old or the new snapshot in full. The replaced connection is
//! closed right after the swap.
//!
//! Rebuilds are serialized. Readers never block on a rebuild.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dl_core::Properties;
use parking_lot::Mutex;

use crate::attributes::AttributeKeyResolver;
use crate::config::DirectoryConnectionConfig;
use crate::connection::{DirectoryConnector, DirectoryContext};
use crate::error::{LdapError, LdapResult};
use crate::factory::{BuildOutcome, DirectoryContextFactory, DisabledReason};
use crate::registrar::DirectoryLoginRegistrar;
use crate::search::{SearchPolicy, SearchPolicyBuilder};

/// Connection state of a snapshot.
#[derive(Debug, Clone)]
pub enum DirectoryState {
    /// No rebuild has completed yet.
    Uninitialized,
    /// No connection, for the given reason.
    Disabled(DisabledReason),
    /// A live connection.
    Connected(Arc<DirectoryContext>),
    /// The holder has been shut down.
    ShutDown,
}

/// Connection state without the handle, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStatus {
    /// No rebuild has completed yet.
    Uninitialized,
    /// No connection, for the given reason.
    Disabled(DisabledReason),
    /// A live connection.
    Connected,
    /// The holder has been shut down.
    ShutDown,
}

impl DirectoryState {
    /// Returns the status of this state.
    #[must_use]
    pub const fn status(&self) -> DirectoryStatus {
        match self {
            Self::Uninitialized => DirectoryStatus::Uninitialized,
            Self::Disabled(reason) => DirectoryStatus::Disabled(*reason),
            Self::Connected(_) => DirectoryStatus::Connected,
            Self::ShutDown => DirectoryStatus::ShutDown,
        }
    }
}

/// One consistent view of the directory configuration and connection.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    /// Incremented on every publication.
    pub generation: u64,

    /// Connection state.
    pub state: DirectoryState,

    /// Search policy built from the same configuration as `state`.
    pub policy: SearchPolicy,

    /// Attribute keys built from the same configuration as `state`.
    pub keys: AttributeKeyResolver,
}

impl DirectorySnapshot {
    fn initial() -> Self {
        Self {
            generation: 0,
            state: DirectoryState::Uninitialized,
            policy: SearchPolicy::default(),
            keys: AttributeKeyResolver::default(),
        }
    }

    /// Returns the live context, if any.
    #[must_use]
    pub fn connection(&self) -> Option<&Arc<DirectoryContext>> {
        match &self.state {
            DirectoryState::Connected(ctx) => Some(ctx),
            _ => None,
        }
    }
}

/// Owns the published [`DirectorySnapshot`] and rebuilds it on demand.
pub struct DirectoryContextHolder {
    factory: DirectoryContextFactory,
    registrars: Vec<Arc<dyn DirectoryLoginRegistrar>>,
    current: ArcSwap<DirectorySnapshot>,
    reload_lock: Mutex<()>,
}

impl DirectoryContextHolder {
    /// Creates an uninitialized holder.
    #[must_use]
    pub fn new(connector: Arc<dyn DirectoryConnector>) -> Self {
        Self {
            factory: DirectoryContextFactory::new(connector),
            registrars: Vec::new(),
            current: ArcSwap::from_pointee(DirectorySnapshot::initial()),
            reload_lock: Mutex::new(()),
        }
    }

    /// Adds a registrar notified after every successful connection.
    #[must_use]
    pub fn with_registrar(mut self, registrar: Arc<dyn DirectoryLoginRegistrar>) -> Self {
        self.registrars.push(registrar);
        self
    }

    /// Rebuilds the snapshot from `properties`.
    ///
    /// The configuration is parsed first; a parse error aborts the rebuild
    /// and leaves the current snapshot in place. Otherwise the search policy
    /// and attribute keys are derived, the context is built, and all three
    /// are published together. A connection failure publishes
    /// [`DisabledReason::ConnectionFailed`] and is returned as an error. In
    /// every published case the previous connection is closed.
    ///
    /// ## Errors
    ///
    /// - [`LdapError::ConfigParse`] for malformed configuration
    /// - connection or bind errors from the directory server
    /// - [`LdapError::ShutDown`] after [`shutdown`](Self::shutdown)
    pub fn reload(&self, properties: &Properties) -> LdapResult<DirectoryStatus> {
        let _guard = self.reload_lock.lock();

        if matches!(self.current.load().state, DirectoryState::ShutDown) {
            return Err(LdapError::ShutDown);
        }

        let config = DirectoryConnectionConfig::from_properties(properties).map_err(|e| {
            tracing::error!(error = %e, "Invalid LDAP configuration, keeping previous context");
            e
        })?;
        let policy = SearchPolicyBuilder::build(&config);
        let keys = AttributeKeyResolver::from_config(&config);

        let (state, result) = match self.factory.build(&config) {
            Ok(BuildOutcome::Connected(ctx)) => {
                let ctx = Arc::new(ctx);
                (DirectoryState::Connected(ctx), Ok(DirectoryStatus::Connected))
            }
            Ok(BuildOutcome::Disabled(reason)) => (
                DirectoryState::Disabled(reason),
                Ok(DirectoryStatus::Disabled(reason)),
            ),
            Err(e) => (
                DirectoryState::Disabled(DisabledReason::ConnectionFailed),
                Err(e),
            ),
        };

        let snapshot = self.publish(state, policy, keys);

        match (&result, snapshot.connection()) {
            (Ok(_), Some(ctx)) => {
                tracing::info!(
                    generation = snapshot.generation,
                    context_id = %ctx.id(),
                    url = %ctx.provider_url(),
                    auth = ctx.auth_mode(),
                    "LDAP login is enabled"
                );
                for registrar in &self.registrars {
                    registrar.on_directory_available(ctx, &snapshot.policy);
                }
            }
            (Err(e), _) => {
                tracing::error!(
                    generation = snapshot.generation,
                    error = %e,
                    "LDAP context rebuild failed, LDAP login is unavailable"
                );
            }
            _ => {}
        }

        result
    }

    /// Closes the live connection and stops accepting rebuilds.
    pub fn shutdown(&self) {
        let _guard = self.reload_lock.lock();
        if matches!(self.current.load().state, DirectoryState::ShutDown) {
            return;
        }

        let snapshot = self.current.load_full();
        self.publish(
            DirectoryState::ShutDown,
            snapshot.policy,
            snapshot.keys.clone(),
        );
        tracing::info!("LDAP context holder shut down");
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        self.current.load_full()
    }

    /// Returns the live context, or `None` if directory login is unavailable.
    #[must_use]
    pub fn connection(&self) -> Option<Arc<DirectoryContext>> {
        self.current.load().connection().cloned()
    }

    /// Returns the current search policy.
    #[must_use]
    pub fn search_policy(&self) -> SearchPolicy {
        self.current.load().policy
    }

    /// Returns the current attribute keys.
    #[must_use]
    pub fn attribute_keys(&self) -> AttributeKeyResolver {
        self.current.load().keys.clone()
    }

    /// Returns the current connection status.
    #[must_use]
    pub fn status(&self) -> DirectoryStatus {
        self.current.load().state.status()
    }

    /// Attribute holding the user display name.
    #[must_use]
    pub fn user_name_key(&self) -> Option<String> {
        self.current.load().keys.user_name_key().map(str::to_string)
    }

    /// Attribute holding the user email address.
    #[must_use]
    pub fn user_email_key(&self) -> Option<String> {
        self.current.load().keys.user_email_key().map(str::to_string)
    }

    /// Base DN, empty when unset.
    #[must_use]
    pub fn base_dn(&self) -> String {
        self.current.load().keys.base_dn().to_string()
    }

    /// User search base, empty when unset.
    #[must_use]
    pub fn user_search_base(&self) -> String {
        self.current.load().keys.user_search_base().to_string()
    }

    /// User search filter template.
    #[must_use]
    pub fn user_filter(&self) -> Option<String> {
        self.current.load().keys.user_filter().map(str::to_string)
    }

    /// Swaps in a new snapshot and closes the connection it replaces.
    fn publish(
        &self,
        state: DirectoryState,
        policy: SearchPolicy,
        keys: AttributeKeyResolver,
    ) -> Arc<DirectorySnapshot> {
        let generation = self.current.load().generation + 1;
        let snapshot = Arc::new(DirectorySnapshot {
            generation,
            state,
            policy,
            keys,
        });

        let previous = self.current.swap(snapshot.clone());
        if let Some(ctx) = previous.connection() {
            if let Err(e) = ctx.close() {
                tracing::warn!(context_id = %ctx.id(), error = %e, "Failed to close replaced LDAP context");
            }
        }
        snapshot
    }
}

impl Drop for DirectoryContextHolder {
    fn drop(&mut self) {
        if let Some(ctx) = self.current.load().connection() {
            if let Err(e) = ctx.close() {
                tracing::warn!(context_id = %ctx.id(), error = %e, "Failed to close LDAP context");
            }
        }
    }
}

impl std::fmt::Debug for DirectoryContextHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryContextHolder")
            .field("current", &self.current.load_full())
            .field("registrars", &self.registrars.len())
            .finish()
    }
}
