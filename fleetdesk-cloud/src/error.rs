//! Cloud sync error types.

use thiserror::Error;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur in cloud sync operations.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("no remote store configuration available")]
    NotConnected,

    #[error("API request failed: {0}")]
    Api(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CloudError {
    /// Returns true if the remote store rejected the request with HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            CloudError::Http(e) => e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS),
            CloudError::Api(msg) => msg.contains("429"),
            _ => false,
        }
    }
}
