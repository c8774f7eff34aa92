//! Network rejection errors.

use std::sync::Arc;

/// Why a fetch rejected instead of producing a response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The request could not be built (bad scheme, method or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error (offline, DNS, connection reset).
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// No connection could be established (refused, DNS failure, no route).
    #[error("network unreachable: {0}")]
    Unreachable(String),

    /// Response body exceeded the configured limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Unreachable(err.to_string())
        } else {
            FetchError::Network(Arc::new(err))
        }
    }
}

impl From<FetchError> for harbor_core::Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidRequest(msg) => harbor_core::Error::InvalidUrl(msg),
            FetchError::Timeout => harbor_core::Error::FetchTimeout("request timeout".into()),
            FetchError::TooLarge { size, limit } => {
                harbor_core::Error::FetchTooLarge(format!("{size} bytes exceeds {limit}"))
            }
            other => harbor_core::Error::FetchFailed(other.to_string()),
        }
    }
}
