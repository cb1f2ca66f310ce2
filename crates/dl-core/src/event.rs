//! Configuration change events.
//!
//! Every publication of a new property set carries one of these, so a
//! subscriber can tell which keys moved and log the revision it rebuilt
//! from.

use chrono::{DateTime, Utc};

/// Describes one publication of the configuration store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChangeEvent {
    /// Monotonic revision, starting at 0 for the initial configuration.
    pub revision: u64,

    /// When the revision was published.
    pub changed_at: DateTime<Utc>,

    /// Keys whose values changed relative to the previous revision.
    pub changed_keys: Vec<String>,
}

impl ConfigChangeEvent {
    /// Creates the event for the initial configuration.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            revision: 0,
            changed_at: Utc::now(),
            changed_keys: Vec::new(),
        }
    }

    /// Creates the event following `previous`.
    #[must_use]
    pub fn next(previous: &Self, changed_keys: Vec<String>) -> Self {
        Self {
            revision: previous.revision + 1,
            changed_at: Utc::now(),
            changed_keys,
        }
    }

    /// Returns true if any key under `prefix` changed.
    #[must_use]
    pub fn touches(&self, prefix: &str) -> bool {
        self.changed_keys.iter().any(|k| k.starts_with(prefix))
    }
}
