//! Process-wide configuration store with change notification.
//!
//! The store owns the current [`ConfigSnapshot`] and publishes every new one
//! over a `tokio::sync::watch` channel. Subscribers always see the latest
//! snapshot; bursts of updates between two reads collapse into one.

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::Properties;
use crate::event::ConfigChangeEvent;

/// A published configuration revision.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// The properties of this revision.
    pub properties: Properties,

    /// What changed to produce this revision.
    pub event: ConfigChangeEvent,
}

/// Holds the current configuration and notifies subscribers on change.
#[derive(Debug)]
pub struct ConfigStore {
    tx: watch::Sender<Arc<ConfigSnapshot>>,
}

impl ConfigStore {
    /// Creates a store seeded with the initial properties.
    #[must_use]
    pub fn new(properties: Properties) -> Self {
        let snapshot = Arc::new(ConfigSnapshot {
            properties,
            event: ConfigChangeEvent::initial(),
        });
        let (tx, _rx) = watch::channel(snapshot);
        Self { tx }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.tx.borrow().clone()
    }

    /// Publishes a new property set and returns the resulting event.
    ///
    /// Subscribers are notified even if no key changed, since an operator
    /// saving the file unchanged still expects a rebuild.
    pub fn update(&self, properties: Properties) -> ConfigChangeEvent {
        let previous = self.current();
        let changed_keys = previous.properties.changed_keys(&properties);
        let event = ConfigChangeEvent::next(&previous.event, changed_keys);

        tracing::info!(
            revision = event.revision,
            changed = event.changed_keys.len(),
            "Configuration updated"
        );

        self.tx.send_replace(Arc::new(ConfigSnapshot {
            properties,
            event: event.clone(),
        }));
        event
    }

    /// Subscribes to configuration changes.
    ///
    /// The current snapshot counts as already seen.
    #[must_use]
    pub fn subscribe(&self) -> ConfigSubscription {
        ConfigSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// A subscription to configuration changes.
#[derive(Debug)]
pub struct ConfigSubscription {
    rx: watch::Receiver<Arc<ConfigSnapshot>>,
}

impl ConfigSubscription {
    /// Returns the latest snapshot and marks it as seen.
    pub fn latest(&mut self) -> Arc<ConfigSnapshot> {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next unseen snapshot.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<ConfigSnapshot>> {
        self.rx.changed().await.ok()?;
        Some(self.latest())
    }
}
