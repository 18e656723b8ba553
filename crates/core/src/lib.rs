//! Shared primitives for all Rust crates in the dsf workspace.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across dsf crates.
pub type DsfResult<T> = Result<T, DsfError>;

/// Common error categories surfaced by the single-flight coordinator.
#[derive(Debug, Error)]
pub enum DsfError {
    /// Invalid input, configuration, or a malformed stored value.
    #[error("validation error: {0}")]
    Validation(String),

    /// Execution identity could not be generated.
    #[error("identity error: {0}")]
    Identity(String),

    /// The backing store failed or could not be reached.
    #[error("store error: {0}")]
    Store(String),

    /// A follower gave up waiting for the leader's result.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The caller's execution context was cancelled.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl DsfError {
    /// Returns true when the error is a follower wait timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns true when the error came from the backing store.
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true when the call was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::DsfError;

    #[test]
    fn timeout_is_distinct_from_store_errors() {
        let timeout = DsfError::Timeout("result not found".to_owned());
        let store = DsfError::Store("connection refused".to_owned());

        assert!(timeout.is_timeout());
        assert!(!timeout.is_store());
        assert!(store.is_store());
        assert!(!store.is_timeout());
    }

    #[test]
    fn errors_display_their_category() {
        let error = DsfError::Cancelled("poll aborted".to_owned());
        assert_eq!(error.to_string(), "cancelled: poll aborted");
    }
}
