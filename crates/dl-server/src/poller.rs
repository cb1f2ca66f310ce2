//! Configuration file polling.
//!
//! Pushes the file into the [`ConfigStore`] whenever its modification time
//! moves. A file that fails to parse is logged and skipped; the store keeps
//! its last good properties.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dl_core::{ConfigChangeEvent, ConfigStore, Properties};

/// Watches one configuration file by modification time.
#[derive(Debug)]
pub struct FilePoller {
    path: PathBuf,
    store: Arc<ConfigStore>,
    last_modified: Option<SystemTime>,
}

impl FilePoller {
    /// Creates a poller for `path` feeding `store`.
    ///
    /// `last_modified` is the modification time of the file the store was
    /// seeded from, if known.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        store: Arc<ConfigStore>,
        last_modified: Option<SystemTime>,
    ) -> Self {
        Self {
            path: path.into(),
            store,
            last_modified,
        }
    }

    /// Checks the file once and publishes it if it changed.
    ///
    /// ## Errors
    ///
    /// Returns an error if the file cannot be read or parsed. The recorded
    /// modification time still advances, so a broken file is reported once
    /// rather than on every tick.
    pub async fn poll_once(&mut self) -> dl_core::Result<Option<ConfigChangeEvent>> {
        let modified = tokio::fs::metadata(&self.path).await?.modified()?;
        if self.last_modified == Some(modified) {
            return Ok(None);
        }
        self.last_modified = Some(modified);

        let content = tokio::fs::read_to_string(&self.path).await?;
        let properties = Properties::from_toml_str(&content)?;
        Ok(Some(self.store.update(properties)))
    }

    /// Polls every `interval` until the task is aborted.
    pub async fn run(mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(Some(event)) => tracing::info!(
                    path = %self.path.display(),
                    revision = event.revision,
                    changed = event.changed_keys.len(),
                    "Configuration file reloaded"
                ),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Configuration file could not be reloaded"
                ),
            }
        }
    }
}

/// Returns the modification time of `path`, if it can be read.
#[must_use]
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
