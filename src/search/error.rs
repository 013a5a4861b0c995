//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The engine could not be reached
    #[error("Search engine unreachable: {0}")]
    Unreachable(String),

    /// The engine answered with a non-success status
    #[error("Search engine returned {status}: {body}")]
    EngineStatus { status: u16, body: String },

    /// The engine response could not be decoded
    #[error("Malformed engine response: {0}")]
    MalformedResponse(String),

    /// Request timed out
    #[error("Search engine request timed out: {0}")]
    Timeout(String),

    /// A requested sort field is not supported
    #[error("Unknown sort field: {0}")]
    InvalidSort(String),

    /// Domain store failure while re-hydrating results
    #[error("Failed to load results: {0}")]
    LoadFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout(err.to_string())
        } else if err.is_decode() {
            SearchError::MalformedResponse(err.to_string())
        } else {
            SearchError::Unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::MalformedResponse(err.to_string())
    }
}

impl From<AppError> for SearchError {
    fn from(err: AppError) -> Self {
        SearchError::LoadFailed(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidSort(field) => {
                AppError::Validation(format!("Unknown sort field: {}", field))
            }
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::Timeout(msg) => AppError::Timeout(msg),
            SearchError::Unreachable(msg) => AppError::Network(msg),
            SearchError::LoadFailed(msg) => AppError::Database(msg),
            other => AppError::Integration {
                integration_source: "search-engine".to_string(),
                message: other.to_string(),
            },
        }
    }
}
