//! Request signing for the openQA API.
//!
//! openQA authenticates write requests with three headers: the API key, the
//! current unix time, and a hex HMAC-SHA1 over the request path and that time,
//! keyed with the API secret.

use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Header carrying the signing timestamp (unix seconds).
pub const API_MICROTIME_HEADER: &str = "X-API-Microtime";
/// Header carrying the hex HMAC-SHA1 signature.
pub const API_HASH_HEADER: &str = "X-API-Hash";

type HmacSha1 = Hmac<Sha1>;

/// An API key and secret pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    /// Create a credential pair.
    ///
    /// Returns `None` if either half is empty, since openQA treats a
    /// half-configured pair as anonymous.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let secret = secret.into();
        if key.is_empty() || secret.is_empty() {
            return None;
        }
        Some(Self { key, secret })
    }

    /// The API key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Sign `url` at `timestamp` with this pair's secret.
    pub fn sign(&self, url: &str, timestamp: u64) -> String {
        sign(&self.secret, url_path(url), timestamp)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Compute `hex(HMAC_SHA1(key = secret, message = path + timestamp))`.
pub fn sign(secret: &str, path: &str, timestamp: u64) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(path.as_bytes());
    mac.update(timestamp.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Strip the scheme and host from `url`, keeping the path and query.
///
/// A URL without any path component is returned unchanged.
pub fn url_path(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    match rest.find('/') {
        Some(i) if i > 0 => &rest[i..],
        _ => rest,
    }
}

/// Seconds since the unix epoch, taken fresh for every signed request.
pub(crate) fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
