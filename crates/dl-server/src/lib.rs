//! Directory login service.
//!
//! Loads the configuration file into a [`ConfigStore`], bootstraps the LDAP
//! directory context, and keeps it in step with the file until shutdown.
//!
//! ## Usage
//!
//! ```bash
//! dl-server --config /etc/dl/system.toml
//! DL_CONFIG=/etc/dl/system.toml dl-server --check
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod poller;
pub mod providers;

use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use dl_core::{ConfigStore, Properties};
use dl_ldap::{ConfigWatcher, DirectoryContextHolder, DirectoryStatus, Ldap3Connector};
use tokio::runtime::Handle;

pub use config::ServerConfig;
pub use poller::FilePoller;
pub use providers::DirectoryLoginMethod;

/// The assembled service.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    config_modified: Option<SystemTime>,
    store: Arc<ConfigStore>,
    holder: Arc<DirectoryContextHolder>,
    login_method: Arc<DirectoryLoginMethod>,
}

impl Server {
    /// Loads the configuration file and wires the service together.
    ///
    /// No directory connection is opened until [`run`](Self::run).
    ///
    /// ## Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed,
    /// or if called outside a tokio runtime.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        // Taken before the read so an edit racing the load is picked up by
        // the poller.
        let config_modified = poller::modified_time(&config.config);
        let properties = Properties::load(&config.config).with_context(|| {
            format!("failed to load configuration from {}", config.config.display())
        })?;
        if properties.is_empty() {
            tracing::warn!(path = %config.config.display(), "Configuration file is empty");
        }
        tracing::info!(
            path = %config.config.display(),
            properties = properties.len(),
            "Configuration loaded"
        );

        let handle =
            Handle::try_current().context("the server must be created inside a tokio runtime")?;
        let login_method = Arc::new(DirectoryLoginMethod::new());
        let holder = DirectoryContextHolder::new(Arc::new(Ldap3Connector::new(handle)))
            .with_registrar(login_method.clone());

        Ok(Self {
            config,
            config_modified,
            store: Arc::new(ConfigStore::new(properties)),
            holder: Arc::new(holder),
            login_method,
        })
    }

    /// Returns the configuration store.
    #[must_use]
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Returns the directory context holder.
    #[must_use]
    pub fn holder(&self) -> &Arc<DirectoryContextHolder> {
        &self.holder
    }

    /// Returns the registered login method.
    #[must_use]
    pub fn login_method(&self) -> &Arc<DirectoryLoginMethod> {
        &self.login_method
    }

    /// Creates the poller for the configuration file, starting from the
    /// modification time seen when the file was loaded.
    #[must_use]
    pub fn file_poller(&self) -> FilePoller {
        FilePoller::new(&self.config.config, self.store.clone(), self.config_modified)
    }

    /// Bootstraps the directory context on the blocking pool.
    ///
    /// ## Errors
    ///
    /// Returns an error if the initial build fails.
    pub async fn bootstrap(&self) -> anyhow::Result<ConfigWatcher> {
        let store = self.store.clone();
        let holder = self.holder.clone();

        let watcher = tokio::task::spawn_blocking(move || ConfigWatcher::bootstrap(&store, holder))
            .await
            .context("bootstrap task failed")?
            .context("failed to initialize the LDAP context")?;

        Ok(watcher)
    }

    /// Runs until Ctrl-C, or returns right after bootstrap in check mode.
    ///
    /// ## Errors
    ///
    /// Returns an error if bootstrap fails or the signal handler cannot be
    /// installed.
    pub async fn run(self) -> anyhow::Result<()> {
        let watcher = self.bootstrap().await?;
        let status = self.holder.status();

        if self.config.check {
            tracing::info!(status = ?status, "Configuration check complete");
            drop(watcher);
            self.shutdown().await;
            return Ok(());
        }

        if status == DirectoryStatus::Connected {
            tracing::info!(
                base_dn = %self.holder.base_dn(),
                "Directory login available"
            );
        }

        let watcher_task = watcher.spawn();
        let poller_task = tokio::spawn(self.file_poller().run(self.config.poll_interval()));

        tracing::info!(
            poll_interval_secs = self.config.poll_interval().as_secs(),
            "Watching configuration for changes"
        );

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        tracing::info!("Shutdown signal received");

        poller_task.abort();
        watcher_task.abort();
        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        let holder = self.holder.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || holder.shutdown()).await {
            tracing::error!(error = %e, "LDAP shutdown task failed");
        }
        tracing::info!("Server stopped");
    }
}
