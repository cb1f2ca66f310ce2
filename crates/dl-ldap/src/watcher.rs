//! Bootstrapping and configuration-driven rebuilds.
//!
//! [`ConfigWatcher::bootstrap`] subscribes to the [`ConfigStore`] and runs
//! the first rebuild. Startup fails if that rebuild fails. [`ConfigWatcher::run`]
//! then rebuilds once per change event until the store goes away. Rebuilds
//! run on the blocking thread pool, one at a time.

use std::sync::Arc;

use dl_core::{ConfigStore, ConfigSubscription};
use tokio::task::JoinHandle;

use crate::error::LdapResult;
use crate::holder::DirectoryContextHolder;

/// Rebuilds the directory context whenever configuration changes.
#[derive(Debug)]
pub struct ConfigWatcher {
    holder: Arc<DirectoryContextHolder>,
    subscription: ConfigSubscription,
}

impl ConfigWatcher {
    /// Subscribes to `store` and performs the initial rebuild.
    ///
    /// Blocks for the duration of the initial bind; call it from a blocking
    /// context.
    ///
    /// ## Errors
    ///
    /// Returns the error of the initial rebuild: a configuration parse
    /// error, or a connection or bind failure.
    pub fn bootstrap(store: &ConfigStore, holder: Arc<DirectoryContextHolder>) -> LdapResult<Self> {
        let mut subscription = store.subscribe();
        let snapshot = subscription.latest();

        let status = holder.reload(&snapshot.properties)?;
        tracing::info!(
            revision = snapshot.event.revision,
            status = ?status,
            "LDAP context initialized"
        );

        Ok(Self {
            holder,
            subscription,
        })
    }

    /// Rebuilds on every configuration change until the store is dropped.
    ///
    /// Failed rebuilds are logged; the next change is the retry.
    pub async fn run(mut self) {
        while let Some(snapshot) = self.subscription.changed().await {
            let holder = self.holder.clone();
            let revision = snapshot.event.revision;
            let changed_at = snapshot.event.changed_at;

            let outcome =
                tokio::task::spawn_blocking(move || holder.reload(&snapshot.properties)).await;

            match outcome {
                Ok(Ok(status)) => {
                    tracing::info!(revision, %changed_at, status = ?status, "LDAP context reloaded");
                }
                Ok(Err(e)) => {
                    tracing::error!(revision, error = %e, "LDAP context reload failed");
                }
                Err(e) => {
                    tracing::error!(revision, error = %e, "LDAP context reload task panicked");
                }
            }
        }

        tracing::debug!("Configuration store closed, LDAP watcher stopping");
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
