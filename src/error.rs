//! Error types for doubtq
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in doubtq
#[derive(Debug, Error)]
pub enum DoubtqError {
    /// Doubt not found in the record set or the store
    #[error("Doubt not found: {0}")]
    NotFound(String),

    /// Caller supplied unusable input (empty title, unknown filter, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the record's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Record store rejected the operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for doubtq operations
pub type Result<T> = std::result::Result<T, DoubtqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = DoubtqError::NotFound("dbt-1".to_string());
        assert_eq!(err.to_string(), "Doubt not found: dbt-1");
    }

    #[test]
    fn test_invalid_input_error() {
        let err = DoubtqError::InvalidInput("title is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: title is empty");
    }

    #[test]
    fn test_invalid_state_error() {
        let err = DoubtqError::InvalidState("already answered".to_string());
        assert_eq!(err.to_string(), "Invalid state: already answered");
    }

    #[test]
    fn test_storage_error() {
        let err = DoubtqError::Storage("file locked".to_string());
        assert_eq!(err.to_string(), "Storage error: file locked");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: DoubtqError = io_err.into();
        assert!(matches!(err, DoubtqError::Io(_)));
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: DoubtqError = json_err.into();
        assert!(matches!(err, DoubtqError::Json(_)));
    }
}
