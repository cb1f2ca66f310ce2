//! Search policy and search results.
//!
//! The [`SearchPolicy`] is rebuilt on every configuration change and
//! published together with the connection it applies to. Entries returned
//! by a search are exposed as [`LdapEntry`].

use std::collections::HashMap;
use std::time::Duration;

use ldap3::SearchEntry;

use crate::config::DirectoryConnectionConfig;

/// Count limit meaning "no limit".
pub const COUNT_UNLIMITED: u32 = 0;

/// LDAP search scope. Directory login always searches the whole subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Search the entire subtree.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Converts to ldap3 scope.
    #[must_use]
    pub const fn to_ldap3(self) -> ldap3::Scope {
        match self {
            Self::Subtree => ldap3::Scope::Subtree,
        }
    }
}

/// Scope and limits applied to directory searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchPolicy {
    /// Search scope.
    pub scope: SearchScope,

    /// Time limit in milliseconds (0 means no limit).
    pub time_limit_ms: u32,

    /// Maximum number of entries (0 means no limit).
    pub count_limit: u32,
}

impl SearchPolicy {
    /// Returns the time limit, or `None` if searches are unbounded.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit_ms > 0).then(|| Duration::from_millis(u64::from(self.time_limit_ms)))
    }

    /// Returns the time limit in whole seconds as sent to the server,
    /// rounding up so a sub-second limit does not become "unlimited".
    #[must_use]
    pub fn time_limit_secs(&self) -> i32 {
        let secs = self.time_limit_ms.div_ceil(1000);
        i32::try_from(secs).unwrap_or(i32::MAX)
    }

    /// Returns the count limit as sent to the server.
    #[must_use]
    pub fn size_limit(&self) -> i32 {
        i32::try_from(self.count_limit).unwrap_or(i32::MAX)
    }
}

/// Derives the [`SearchPolicy`] from configuration.
pub struct SearchPolicyBuilder;

impl SearchPolicyBuilder {
    /// Builds the search policy. Never fails: the time limit was already
    /// validated when the configuration was parsed.
    #[must_use]
    pub fn build(config: &DirectoryConnectionConfig) -> SearchPolicy {
        SearchPolicy {
            scope: SearchScope::Subtree,
            time_limit_ms: config.search_time_limit_ms,
            count_limit: COUNT_UNLIMITED,
        }
    }
}

/// Represents an LDAP entry with parsed attributes.
#[derive(Debug, Clone)]
pub struct LdapEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Attributes (all values are multi-valued).
    pub attributes: HashMap<String, Vec<String>>,

    /// Binary attributes.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdapEntry {
    /// Creates a new LDAP entry from search result.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
            binary_attributes: entry.bin_attrs,
        }
    }

    /// Gets a single-valued attribute.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}
