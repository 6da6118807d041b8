//! Error types for the Parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum so callers can decide
//! which failures degrade a single context source and which abort a turn.

use thiserror::Error;

/// The top-level error type for all Parley operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation / embedding provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Session store errors ---
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    // --- Vector search errors ---
    #[error("Vector search error: {0}")]
    Search(#[from] SearchError),

    // --- Document store errors ---
    #[error("Document store error: {0}")]
    Document(#[from] DocumentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether the caller should retry later rather than treat this as a hard failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Vector search request failed: {0}")]
    RequestFailed(String),

    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding failed: {0}")]
    Embedding(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to fetch {file_name} (status {status})")]
    Fetch { file_name: String, status: u16 },

    #[error("Network error while fetching {file_name}: {reason}")]
    Network { file_name: String, reason: String },

    #[error("Cache I/O error at {path}: {reason}")]
    Cache { path: String, reason: String },

    #[error("Text extraction failed for {path}: {reason}")]
    Extraction { path: String, reason: String },

    #[error("Page {page} out of range for {path} ({total} pages)")]
    PageOutOfRange { path: String, page: usize, total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 503,
            message: "Service unavailable".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service unavailable"));
    }

    #[test]
    fn rate_limit_is_distinguishable() {
        let limited = ProviderError::RateLimited { retry_after_secs: 5 };
        let hard = ProviderError::Network("connection reset".into());
        assert!(limited.is_rate_limited());
        assert!(!hard.is_rate_limited());
    }

    #[test]
    fn document_error_names_the_file() {
        let err = Error::Document(DocumentError::Fetch {
            file_name: "employee_handbook.pdf".into(),
            status: 404,
        });
        assert!(err.to_string().contains("employee_handbook.pdf"));
        assert!(err.to_string().contains("404"));
    }
}
