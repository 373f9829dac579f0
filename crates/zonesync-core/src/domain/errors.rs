//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures when constructing identifiers and tokens.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid change token (empty or undecodable)
    #[error("Invalid change token: {0}")]
    InvalidChangeToken(String),

    /// Invalid subscription identifier
    #[error("Invalid subscription ID: {0}")]
    InvalidSubscriptionId(String),

    /// Invalid partition name
    #[error("Invalid partition name: {0}")]
    InvalidPartitionName(String),

    /// Invalid record identifier
    #[error("Invalid record ID: {0}")]
    InvalidRecordId(String),

    /// Unknown scope kind
    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidChangeToken("empty".to_string());
        assert_eq!(err.to_string(), "Invalid change token: empty");

        let err = DomainError::UnknownScope("team".to_string());
        assert_eq!(err.to_string(), "Unknown scope: team");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidPartitionName("a".to_string());
        let err2 = DomainError::InvalidPartitionName("a".to_string());
        let err3 = DomainError::InvalidPartitionName("b".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
