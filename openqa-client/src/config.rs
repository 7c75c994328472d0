//! Instance configuration.

use crate::client::{DEFAULT_MAX_RECURSIONS, O3_URL};
use serde::{Deserialize, Serialize};
use std::env;

/// Base URL of the SUSE internal openQA instance.
pub const OSD_URL: &str = "http://openqa.suse.de";

/// Configuration for an [`Instance`](crate::Instance).
///
/// Deserializable from any serde format, so it can live in a config file
/// next to other settings of the calling application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Base URL, or one of the aliases `o3`, `ooo`, `osd`.
    pub remote: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Capture bodies of failed responses.
    pub verbose: bool,
    /// Maximum fetches when following a clone chain.
    pub max_recursions: usize,
    /// Override the default `User-Agent`.
    pub user_agent: Option<String>,
    /// Allow concurrent requests through one instance.
    pub allow_parallel: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            remote: O3_URL.to_string(),
            api_key: None,
            api_secret: None,
            verbose: false,
            max_recursions: DEFAULT_MAX_RECURSIONS,
            user_agent: None,
            allow_parallel: false,
        }
    }
}

impl InstanceConfig {
    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `OPENQA_REMOTE`: base URL or alias
    /// - `OPENQA_API_KEY`, `OPENQA_API_SECRET`: credentials
    /// - `OPENQA_VERBOSE`: "true" or "1" to enable
    /// - `OPENQA_MAX_RECURSIONS`: clone-follow bound
    /// - `OPENQA_USER_AGENT`: custom user agent
    /// - `OPENQA_ALLOW_PARALLEL`: "true" or "1" to enable
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            remote: env::var("OPENQA_REMOTE").unwrap_or(defaults.remote),
            api_key: env::var("OPENQA_API_KEY").ok().filter(|s| !s.is_empty()),
            api_secret: env::var("OPENQA_API_SECRET").ok().filter(|s| !s.is_empty()),
            verbose: env::var("OPENQA_VERBOSE")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.verbose),
            max_recursions: env::var("OPENQA_MAX_RECURSIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_recursions),
            user_agent: env::var("OPENQA_USER_AGENT").ok(),
            allow_parallel: env::var("OPENQA_ALLOW_PARALLEL")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.allow_parallel),
        }
    }

    /// The remote with aliases expanded.
    pub fn resolved_remote(&self) -> String {
        resolve_remote(&self.remote)
    }
}

fn parse_flag(s: &str) -> bool {
    s.eq_ignore_ascii_case("true") || s == "1"
}

/// Expand well-known instance aliases. URLs with a scheme pass through.
pub fn resolve_remote(remote: &str) -> String {
    if remote.starts_with("http://") || remote.starts_with("https://") {
        return remote.to_string();
    }
    match remote {
        "" | "o3" | "ooo" => O3_URL.to_string(),
        "osd" => OSD_URL.to_string(),
        other => other.to_string(),
    }
}
