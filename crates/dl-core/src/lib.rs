//! # dl-core
//!
//! Configuration primitives shared by the directory login crates.
//!
//! This crate provides the string-keyed property set the directory
//! connection is derived from, and the change-event source that drives
//! connection rebuilds.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod store;

pub use config::Properties;
pub use error::{Error, Result};
pub use event::ConfigChangeEvent;
pub use store::{ConfigSnapshot, ConfigStore, ConfigSubscription};
