//! Downstream notification of directory availability.

use crate::connection::DirectoryContext;
use crate::search::SearchPolicy;

/// Implemented by the login method that authenticates against the
/// directory.
///
/// The holder calls [`on_directory_available`](Self::on_directory_available)
/// exactly once per successful rebuild, after the new context has been
/// published. Implementations should register or refresh their login method
/// and return quickly; the rebuild is blocked until they do.
pub trait DirectoryLoginRegistrar: Send + Sync {
    /// A new directory context is live.
    fn on_directory_available(&self, context: &DirectoryContext, policy: &SearchPolicy);
}
