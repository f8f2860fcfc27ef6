//! Error types for amora-core

use thiserror::Error;
use tracing::warn;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Caller is not allowed to perform the operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Connection-level failure while relaying frames
    #[error("transport error: {0}")]
    Transport(String),

    /// Database failure
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// JSON encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// LLM provider failure
    #[error("provider error: {0}")]
    Provider(#[from] amora_llm::Error),

    /// Invariant violation inside the engine
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Run a best-effort side operation, logging instead of propagating failure.
///
/// Used for bookkeeping writes (delivery status, conversation timestamps,
/// analytics rows) that must never take down the main flow.
pub fn advisory<T>(op: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(op, error = %err, "advisory operation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::NotFound("conversation");
        assert_eq!(err.to_string(), "conversation not found");
    }

    #[test]
    fn test_provider_error_converts() {
        let err: Error = amora_llm::Error::Api("rate limited".to_string()).into();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn test_advisory_swallows_errors() {
        let ok = advisory("touch", Ok(7));
        assert_eq!(ok, Some(7));

        let failed: Option<()> = advisory("touch", Err(Error::Internal("oops".to_string())));
        assert!(failed.is_none());
    }
}
