//! Error types for the openQA client.

use thiserror::Error;

/// Errors that can occur when talking to an openQA instance.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connect, DNS, TLS or body read failure).
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a status other than 200.
    #[error("http status code {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, only captured in verbose mode.
        body: Option<String>,
    },

    /// Response body does not decode into the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The expected envelope field is missing from the response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A by-ID lookup came back with an empty collection.
    #[error("not found: {0}")]
    NotFound(String),

    /// Following a clone chain exceeded the configured bound.
    #[error("maximum recursion depth reached ({depth})")]
    RecursionLimit {
        /// The configured maximum.
        depth: usize,
    },

    /// The operation needs configuration the instance does not have.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid base URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status code carried by a [`ClientError::Status`] error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
