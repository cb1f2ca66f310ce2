//! Login method registration.
//!
//! The service does not authenticate users itself. It keeps track of which
//! directory context the login flow should use and reports availability
//! changes, which is what the login plugin needs from this process.

use std::sync::atomic::{AtomicU64, Ordering};

use dl_ldap::{DirectoryContext, DirectoryLoginRegistrar, SearchPolicy};

/// Records directory login registrations.
#[derive(Debug, Default)]
pub struct DirectoryLoginMethod {
    registrations: AtomicU64,
}

impl DirectoryLoginMethod {
    /// Creates a registrar with no registrations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times directory login has been (re)registered.
    #[must_use]
    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::SeqCst)
    }
}

impl DirectoryLoginRegistrar for DirectoryLoginMethod {
    fn on_directory_available(&self, context: &DirectoryContext, policy: &SearchPolicy) {
        let count = self.registrations.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            context_id = %context.id(),
            registrations = count,
            time_limit_ms = policy.time_limit_ms,
            "Directory login method registered"
        );
    }
}
