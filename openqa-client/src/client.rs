//! Core openQA client implementation.

use crate::auth::{self, API_HASH_HEADER, API_KEY_HEADER, API_MICROTIME_HEADER, Credentials};
use crate::config::InstanceConfig;
use crate::error::{ClientError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Method, StatusCode};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Base URL of the public openSUSE openQA instance.
pub const O3_URL: &str = "https://openqa.opensuse.org";

/// Default bound for following clone chains.
pub const DEFAULT_MAX_RECURSIONS: usize = 10;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Default `User-Agent` sent with every request.
pub fn default_user_agent() -> String {
    format!("openqa-client/{}", env!("CARGO_PKG_VERSION"))
}

/// A handle to one openQA instance.
///
/// Cloning is cheap. Clones share the HTTP connection pool and the request
/// gate, so they count as the same instance for single-flight purposes.
/// Separately constructed instances never contend with each other.
///
/// # Example
///
/// ```no_run
/// use openqa_client::Instance;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let instance = Instance::new("https://openqa.opensuse.org")?
///     .with_credentials("KEY", "SECRET")
///     .with_max_recursion_depth(20);
///
/// let job = instance.get_job_follow(4242).await?;
/// println!("{}: {}", job.link, job);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Instance {
    /// Base URL of the instance, without a trailing slash.
    base_url: String,
    /// HTTP client.
    http: HttpClient,
    /// API key and secret, if configured.
    credentials: Option<Credentials>,
    verbose: bool,
    max_recursions: usize,
    user_agent: String,
    /// Skip the request gate.
    allow_parallel: bool,
    /// Held for the full round trip of every request unless `allow_parallel` is set.
    gate: Arc<Mutex<()>>,
}

impl Instance {
    /// Create a handle for the instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL has no http/https scheme or the HTTP
    /// client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let http = HttpClient::builder().build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            credentials: None,
            verbose: false,
            max_recursions: DEFAULT_MAX_RECURSIONS,
            user_agent: default_user_agent(),
            allow_parallel: false,
            gate: Arc::new(Mutex::new(())),
        })
    }

    /// Handle for openqa.opensuse.org.
    pub fn o3() -> Result<Self> {
        Self::new(O3_URL)
    }

    /// Build an instance from a configuration.
    pub fn from_config(config: &InstanceConfig) -> Result<Self> {
        let mut instance = Self::new(config.resolved_remote())?
            .with_verbose(config.verbose)
            .with_max_recursion_depth(config.max_recursions)
            .with_allow_parallel(config.allow_parallel);
        if let Some(ua) = &config.user_agent {
            instance = instance.with_user_agent(ua.as_str());
        }
        if let (Some(key), Some(secret)) = (&config.api_key, &config.api_secret) {
            instance = instance.with_credentials(key.as_str(), secret.as_str());
        }
        Ok(instance)
    }

    /// Set the API key and secret used to sign requests.
    ///
    /// An empty key or secret leaves the instance anonymous.
    #[must_use]
    pub fn with_credentials(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Credentials::new(key, secret);
        self
    }

    /// Capture response bodies of failed requests and log write responses.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Maximum number of fetches when following a clone chain.
    #[must_use]
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursions = depth;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Allow requests through this instance to run concurrently.
    ///
    /// Only enable this if the remote instance is known to cope with it.
    #[must_use]
    pub fn with_allow_parallel(mut self, allow: bool) -> Self {
        self.allow_parallel = allow;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn max_recursion_depth(&self) -> usize {
        self.max_recursions
    }

    /// True if an API key and secret are configured.
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Fail unless credentials are configured.
    pub(crate) fn require_credentials(&self) -> Result<()> {
        if self.has_credentials() {
            Ok(())
        } else {
            Err(ClientError::Configuration(
                "API key or secret not set".to_string(),
            ))
        }
    }

    /// Build a full API URL from a path relative to `/api/v1/`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// Execute a GET request.
    pub(crate) async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.request(Method::GET, url, None).await
    }

    /// Execute a POST request with a form-encoded (or otherwise raw) body.
    pub(crate) async fn post(&self, url: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        self.request(Method::POST, url, body).await
    }

    /// Execute a DELETE request.
    pub(crate) async fn delete(&self, url: &str) -> Result<Vec<u8>> {
        self.request(Method::DELETE, url, None).await
    }

    /// Sign, send and classify one request.
    ///
    /// Any status other than 200 is an error. In verbose mode the body of a
    /// failed response is logged and carried in the error.
    #[tracing::instrument(level = "debug", skip(self, body), fields(signed = self.credentials.is_some()))]
    pub(crate) async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let _guard = if self.allow_parallel {
            None
        } else {
            Some(self.gate.lock().await)
        };

        let mut builder = self
            .http
            .request(method, url)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str());

        if let Some(body) = body.filter(|b| !b.is_empty()) {
            builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body);
        }

        if let Some(creds) = &self.credentials {
            let timestamp = auth::unix_timestamp();
            builder = builder
                .header(API_KEY_HEADER, creds.key())
                .header(API_MICROTIME_HEADER, timestamp.to_string())
                .header(API_HASH_HEADER, creds.sign(url, timestamp));
        }

        tracing::debug!("Sending request");
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        tracing::debug!(status = %status, len = bytes.len(), "Received response");

        if status != StatusCode::OK {
            let body = self
                .verbose
                .then(|| String::from_utf8_lossy(&bytes).into_owned());
            match &body {
                Some(body) => tracing::warn!(status = %status, body = %body, "Request failed"),
                None => tracing::warn!(status = %status, "Request failed"),
            }
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(bytes.to_vec())
    }

    /// Log a write response body when verbose.
    pub(crate) fn trace_body(&self, operation: &str, body: &[u8]) {
        if self.verbose {
            tracing::info!(
                operation,
                body = %String::from_utf8_lossy(body),
                "Response body"
            );
        }
    }
}

/// Render query parameters, splitting each value on commas into repeated keys.
///
/// openQA reads a repeated parameter as an array.
pub(crate) fn merge_params<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    params
        .into_iter()
        .flat_map(|(k, v)| v.split(',').map(move |part| (k, part)))
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
