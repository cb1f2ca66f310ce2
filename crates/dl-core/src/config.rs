//! String-keyed configuration properties.
//!
//! Properties are loaded from a TOML file. Nested tables are flattened into
//! dotted keys, so
//!
//! ```toml
//! [ldap]
//! enabled = true
//! server = "ldap://dir.example:389"
//! ```
//!
//! yields `ldap.enabled = "true"` and `ldap.server = "ldap://dir.example:389"`.
//! Consumers enumerate the keys they need and build their own typed view.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Marker substrings of keys whose values are never printed.
const SECRET_KEY_MARKERS: &[&str] = &["password", "secret", "credential"];

/// An immutable-by-convention set of configuration properties.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Creates an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads properties from a TOML file.
    ///
    /// ## Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parses properties from TOML text.
    ///
    /// ## Errors
    ///
    /// Returns an error if the text is not valid TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| Error::Parse(e.message().to_string()))?;

        let mut entries = BTreeMap::new();
        flatten_table("", &table, &mut entries);
        Ok(Self { entries })
    }

    /// Sets a property, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a property, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes a property.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Gets a property verbatim.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Gets a property, falling back to `default` when it is not set.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Gets a non-blank property, trimmed.
    #[must_use]
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Gets a boolean property.
    ///
    /// Accepts `true` and `false` in any letter case. An unset or blank key
    /// yields `default`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the value is neither `true` nor `false`.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get_non_blank(key) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(_) => Err(Error::invalid_value(key, "expected `true` or `false`")),
        }
    }

    /// Gets and parses a property.
    ///
    /// Returns `Ok(None)` if the key is unset or blank.
    ///
    /// ## Errors
    ///
    /// Returns an error if the value does not parse as `T`.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get_non_blank(key)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|e| Error::invalid_value(key, e.to_string()))
            })
            .transpose()
    }

    /// Returns the keys whose values differ between `self` and `other`,
    /// including keys present on only one side.
    #[must_use]
    pub fn changed_keys(&self, other: &Self) -> Vec<String> {
        let mut changed: Vec<String> = self
            .entries
            .iter()
            .filter(|(k, v)| other.entries.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect();

        changed.extend(
            other
                .entries
                .keys()
                .filter(|k| !self.entries.contains_key(*k))
                .cloned(),
        );
        changed.sort();
        changed
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.entries {
            if is_secret_key(key) {
                map.entry(key, &"[REDACTED]");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Returns true if values of `key` must never be printed.
#[must_use]
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_KEY_MARKERS.iter().any(|m| key.contains(m))
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        match value {
            toml::Value::Table(nested) => flatten_table(&key, nested, out),
            other => {
                out.insert(key, scalar_to_string(other));
            }
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(d) => d.to_string(),
        toml::Value::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(","),
        // Tables inside arrays have no dotted-key form.
        toml::Value::Table(_) => String::new(),
    }
}
