//! Error types for Keyward
//!
//! Every failed precondition surfaces as a distinct kind; the HTTP adapter
//! maps kinds to status codes via `status_code()`. No retry happens here.

use hyper::StatusCode;

/// Errors raised while loading the key set from its configured source
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The source could not be read: unreachable host, non-success HTTP
    /// status, fetch timeout, or a local IO failure other than file-missing
    #[error("Key source unavailable: {0}")]
    SourceUnavailable(String),

    /// The payload was valid JSON but neither object- nor array-shaped
    #[error("Unsupported key payload format: {0}")]
    UnsupportedFormat(String),
}

/// Errors raised by individual registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    /// Durable snapshot write failed; the in-memory mutation was rolled back
    #[error("Failed to persist key store: {0}")]
    PersistFailed(String),
}

impl LoadError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UnsupportedFormat(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl RegistryError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PersistFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Implement From conversions for common error types

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        Self::SourceUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        Self::PersistFailed(err.to_string())
    }
}
