//! Common error types for vaultbridge.

use thiserror::Error;

/// Top-level error type for vaultbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An identifier was empty or whitespace-only.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Attempt to materialize a store's synthetic "no folder" container.
    #[error("Reserved container: {0}")]
    ReservedContainer(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not supported by this store (e.g. writes on a read-only source).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Credentials were rejected by the store.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Store data did not have the expected shape.
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// Store request failed.
    #[error("Request failed: {0}")]
    Request(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error only reports an absent resource.
    ///
    /// Callers probing optimistically (`find_by_id`) treat this as "absent";
    /// every other variant is fatal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(Error::NotFound("folder x".to_string()).is_not_found());
        assert!(!Error::Request("boom".to_string()).is_not_found());
        assert!(!Error::Authentication("401".to_string()).is_not_found());
    }

    #[test]
    fn test_display() {
        let err = Error::Unsupported("create on csv".to_string());
        assert_eq!(err.to_string(), "Unsupported operation: create on csv");
    }
}
