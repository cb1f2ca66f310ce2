//! # dl-ldap
//!
//! Directory (LDAP) connection context for directory login.
//!
//! This crate owns the lifecycle of the directory connection used by the
//! login and user-search code: it derives a bind environment from
//! configuration, connects with `ldap3`, and publishes the connection
//! together with its search policy and attribute keys as one atomic
//! snapshot. The snapshot is rebuilt on every configuration change.
//!
//! ```text
//! ConfigStore ──change──▶ ConfigWatcher ──▶ DirectoryContextHolder::reload
//!                                              ├─ SearchPolicyBuilder
//!                                              ├─ DirectoryContextFactory ──▶ DirectoryConnector
//!                                              └─ publish ──▶ DirectoryLoginRegistrar
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attributes;
pub mod config;
pub mod connection;
pub mod error;
pub mod factory;
pub mod holder;
pub mod registrar;
pub mod search;
pub mod watcher;

pub use attributes::AttributeKeyResolver;
pub use config::{BindAuthentication, BindEnvironment, DirectoryConnectionConfig};
pub use connection::{DirectoryConnection, DirectoryConnector, DirectoryContext, Ldap3Connector};
pub use error::{LdapError, LdapResult};
pub use factory::{BuildOutcome, DirectoryContextFactory, DisabledReason};
pub use holder::{DirectoryContextHolder, DirectorySnapshot, DirectoryState, DirectoryStatus};
pub use registrar::DirectoryLoginRegistrar;
pub use search::{LdapEntry, SearchPolicy, SearchPolicyBuilder, SearchScope};
pub use watcher::ConfigWatcher;
