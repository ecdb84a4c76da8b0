//! Error types for relay.
//!
//! Uses thiserror for derive macros. Poll timeouts and lost-contact results are
//! not errors: they are reported through `PollOutcome` so callers can keep the
//! session id for follow-up.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Invalid arguments, configuration, or template input.
    #[error("{0}")]
    UserError(String),

    /// Network failure or non-2xx response from the remote service.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote service kept throttling after local backoff.
    #[error("rate limited by remote service: {0}")]
    RateLimited(String),

    /// No artifact matched any extraction strategy, or an attachment is gone.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading or writing the local artifact cache failed.
    #[error("cache error: {0}")]
    CacheError(String),
}

impl RelayError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RelayError::UserError(_) => exit_codes::USER_ERROR,
            RelayError::Transport(_) => exit_codes::TRANSPORT_FAILURE,
            RelayError::RateLimited(_) => exit_codes::RATE_LIMITED,
            RelayError::NotFound(_) => exit_codes::NOT_FOUND,
            RelayError::CacheError(_) => exit_codes::CACHE_FAILURE,
        }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// A missing attachment stays missing, so `NotFound` is not transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::Transport(_) | RelayError::RateLimited(_))
    }
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = RelayError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn transport_error_has_correct_exit_code() {
        let err = RelayError::Transport("connection reset".to_string());
        assert_eq!(err.exit_code(), exit_codes::TRANSPORT_FAILURE);
    }

    #[test]
    fn rate_limited_has_correct_exit_code() {
        let err = RelayError::RateLimited("429".to_string());
        assert_eq!(err.exit_code(), exit_codes::RATE_LIMITED);
    }

    #[test]
    fn not_found_has_correct_exit_code() {
        let err = RelayError::NotFound("plan.json".to_string());
        assert_eq!(err.exit_code(), exit_codes::NOT_FOUND);
    }

    #[test]
    fn cache_error_has_correct_exit_code() {
        let err = RelayError::CacheError("disk full".to_string());
        assert_eq!(err.exit_code(), exit_codes::CACHE_FAILURE);
    }

    #[test]
    fn user_errors_are_not_transient() {
        assert!(!RelayError::UserError("x".into()).is_transient());
        assert!(!RelayError::CacheError("x".into()).is_transient());
        assert!(!RelayError::NotFound("x".into()).is_transient());
        assert!(RelayError::Transport("x".into()).is_transient());
        assert!(RelayError::RateLimited("x".into()).is_transient());
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = RelayError::NotFound("no artifact matched 'plan'".to_string());
        assert_eq!(err.to_string(), "not found: no artifact matched 'plan'");

        let err = RelayError::Transport("HTTP 502".to_string());
        assert_eq!(err.to_string(), "transport error: HTTP 502");
    }
}
