//! Muninn error types

use std::time::Duration;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    /// The fact service inspected the query and stated it cannot answer it.
    ///
    /// This is a stable domain outcome, not a fault: the gateway caches it in
    /// the error namespace and callers fall back to the model path.
    #[error("fact service declined: {0}")]
    FactDeclined(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("no chat model configured")]
    NoChatModel,

    #[error("no fact source configured")]
    NoFactSource,

    #[error("configuration error: {0}")]
    Configuration(String),

    // Soft errors
    #[error("empty response from model")]
    EmptyResponse,
}

impl MuninnError {
    /// Whether the error is worth retrying.
    ///
    /// Transient errors are network-level failures, rate limits, server-side
    /// 5xx responses and empty replies. Everything else (auth, declines,
    /// malformed input, configuration) is permanent and retried never.
    pub fn is_transient(&self) -> bool {
        match self {
            MuninnError::Http(_) => true,
            MuninnError::RateLimited { .. } => true,
            MuninnError::Api { status, .. } => *status >= 500,
            MuninnError::EmptyResponse => true,
            _ => false,
        }
    }

    /// Provider-supplied retry delay, if the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MuninnError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
