//! Custom error types and handling
//!
//! This module defines the engine's error taxonomy. Every mutating
//! operation returns either a success value or one of these variants
//! carrying a human-readable reason string; the embedding service layer
//! renders them however it sees fit.

use serde::Serialize;

use crate::store::StoreError;

/// Engine-wide error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // Precondition violations: capacity, deadlines, duplicate
    // registrations, malformed ballots. Always recoverable.
    #[error("Validation error: {0}")]
    Validation(String),

    // Captain-only operations, recusal violations. Distinct from
    // Validation so callers can render different UI.
    #[error("Forbidden: {0}")]
    Authorization(String),

    // Optimistic-concurrency loss on a contended entity. Recoverable
    // by retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    // Referenced entity missing
    #[error("Not found: {0}")]
    NotFound(String),

    // Storage collaborator failure, propagated unmodified. Retry
    // policy belongs to the caller.
    #[error("Dependency error: {0}")]
    Dependency(String),

    // Internal errors
    #[error("Internal engine error")]
    Internal(#[from] anyhow::Error),
}

/// Serializable error details for the embedding API layer
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl EngineError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Authorization(_) => "AUTHORIZATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Dependency(_) => "DEPENDENCY_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the same operation can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Dependency(_))
    }

    /// Build the serializable detail view
    pub fn details(&self) -> ErrorDetails {
        let message = match self {
            Self::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        ErrorDetails {
            code: self.error_code().to_string(),
            message,
        }
    }

    /// Shorthand for a validation failure with a contract reason string
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Shorthand for an authorization failure
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Authorization(reason.into())
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => EngineError::NotFound(what),
            StoreError::RevisionConflict(what) => {
                EngineError::Conflict(format!("Concurrent update on {what}"))
            }
            StoreError::Duplicate(what) => {
                EngineError::Conflict(format!("Duplicate record: {what}"))
            }
            StoreError::CapacityExceeded(what) => {
                EngineError::Conflict(format!("Capacity exceeded for {what}"))
            }
            StoreError::Timeout(what) | StoreError::Unavailable(what) => {
                EngineError::Dependency(what)
            }
        }
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(err: validator::ValidationErrors) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EngineError::validation("Team is full").error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            EngineError::forbidden("Only team captain can register team").error_code(),
            "AUTHORIZATION_ERROR"
        );
        assert_eq!(
            EngineError::from(StoreError::Timeout("store read timed out".into())).error_code(),
            "DEPENDENCY_ERROR"
        );
    }

    #[test]
    fn test_retryability() {
        assert!(EngineError::Conflict("lost the race".into()).is_retryable());
        assert!(EngineError::Dependency("timeout".into()).is_retryable());
        assert!(!EngineError::validation("Registration is not open").is_retryable());
    }

    #[test]
    fn test_store_error_mapping() {
        let err = EngineError::from(StoreError::NotFound("Competition not found".into()));
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = EngineError::from(StoreError::RevisionConflict("team".into()));
        assert!(matches!(err, EngineError::Conflict(_)));
    }
}
