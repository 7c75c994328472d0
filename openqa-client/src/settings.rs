//! Settings codec.
//!
//! Machines and products carry their settings as a plain mapping in this
//! crate, but openQA sends and expects them as a list of
//! `{"key": ..., "value": ...}` records. Writes additionally flatten the
//! mapping into `settings[KEY]=VALUE` form pairs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical settings mapping.
pub type Settings = BTreeMap<String, String>;

/// One `{"key": ..., "value": ...}` record as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRecord {
    /// Setting name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Setting value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl SettingRecord {
    /// A complete record.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }
}

/// Convert a mapping into its wire list, one record per key.
pub fn to_wire(settings: &Settings) -> Vec<SettingRecord> {
    settings
        .iter()
        .map(|(k, v)| SettingRecord::new(k.as_str(), v.as_str()))
        .collect()
}

/// Convert a wire list into a mapping.
///
/// Records missing either half are skipped. Later duplicates win.
pub fn from_wire<'a, I>(records: I) -> Settings
where
    I: IntoIterator<Item = &'a SettingRecord>,
{
    records
        .into_iter()
        .filter_map(|r| match (&r.key, &r.value) {
            (Some(k), Some(v)) => Some((k.clone(), v.clone())),
            _ => None,
        })
        .collect()
}

/// Form key under which openQA expects a single setting.
pub fn form_key(key: &str) -> String {
    format!("settings[{}]", key)
}

/// A `application/x-www-form-urlencoded` body or query string under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBody {
    pairs: Vec<(String, String)>,
}

impl FormBody {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Append a pair, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Append every setting as a `settings[KEY]=VALUE` pair.
    pub fn push_settings(&mut self, settings: &Settings) {
        for (k, v) in settings {
            self.push(form_key(k), v.as_str());
        }
    }

    /// Whether the form has no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Percent-encode every key and value and join them with `&`.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
