//! Configured attribute keys.
//!
//! Downstream search and mapping code asks this resolver which directory
//! attributes hold the user's display name and email, where to search, and
//! which filter to use. Values are returned verbatim. `base_dn` and
//! `user_search_base` default to the empty string; the other keys stay
//! `None` when unset, which callers treat as "attribute mapping not
//! configured".

use crate::config::DirectoryConnectionConfig;

/// Read accessors for the configured attribute keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeKeyResolver {
    user_name_key: Option<String>,
    user_email_key: Option<String>,
    base_dn: String,
    user_search_base: String,
    user_filter: Option<String>,
}

impl AttributeKeyResolver {
    /// Captures the attribute keys of a configuration.
    #[must_use]
    pub fn from_config(config: &DirectoryConnectionConfig) -> Self {
        Self {
            user_name_key: config.user_display_name_key.clone(),
            user_email_key: config.user_email_key.clone(),
            base_dn: config.base_dn.clone(),
            user_search_base: config.user_search_base.clone(),
            user_filter: config.user_filter.clone(),
        }
    }

    /// Attribute holding the user display name.
    #[must_use]
    pub fn user_name_key(&self) -> Option<&str> {
        self.user_name_key.as_deref()
    }

    /// Attribute holding the user email address.
    #[must_use]
    pub fn user_email_key(&self) -> Option<&str> {
        self.user_email_key.as_deref()
    }

    /// Base DN, empty when unset.
    #[must_use]
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// User search base, empty when unset.
    #[must_use]
    pub fn user_search_base(&self) -> &str {
        &self.user_search_base
    }

    /// User search filter template.
    #[must_use]
    pub fn user_filter(&self) -> Option<&str> {
        self.user_filter.as_deref()
    }
}
