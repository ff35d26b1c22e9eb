//! Relay error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors reported by relay operations.
///
/// None of these are fatal to the process; every variant maps to a response
/// for one caller while the server keeps serving others.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required request field was absent or empty
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// No public key registered for the user
    #[error("no public key registered for user {0}")]
    KeyNotFound(String),

    /// Send addressed to a recipient with no registered key
    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    /// Client is sending faster than the per-client minimum interval
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited {
        /// Time until the client's next send will be accepted
        retry_after: Duration,
    },

    /// Serialized payload exceeds the configured ceiling
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Serialized payload size in bytes
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RelayError::PayloadTooLarge { size: 6000, max: 5000 };
        assert_eq!(
            err.to_string(),
            "payload too large: 6000 bytes exceeds maximum 5000"
        );

        let err = RelayError::MissingField("recipient_id");
        assert!(err.to_string().contains("recipient_id"));
    }
}
