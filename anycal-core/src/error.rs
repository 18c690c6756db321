//! Error types for the anycal ecosystem.

use thiserror::Error;

/// Errors that can occur in anycal operations.
#[derive(Error, Debug)]
pub enum AnycalError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Provider error: {message}")]
    Provider {
        message: String,
        /// Whether the orchestrator may retry the call with backoff.
        retryable: bool,
        /// Backoff hint in seconds, taken from a Retry-After header when present.
        retry_after: Option<u64>,
    },

    #[error("Provider request timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed event data: {0}")]
    Reconciliation(String),

    #[error("Calendar link not found: {0}")]
    LinkNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for anycal operations.
pub type AnycalResult<T> = Result<T, AnycalError>;

impl AnycalError {
    /// A provider failure that should not be retried (bad request, malformed
    /// response).
    pub fn provider(message: impl Into<String>) -> Self {
        AnycalError::Provider {
            message: message.into(),
            retryable: false,
            retry_after: None,
        }
    }

    /// A transient provider failure (connection reset, 5xx) worth retrying.
    pub fn provider_retryable(message: impl Into<String>) -> Self {
        AnycalError::Provider {
            message: message.into(),
            retryable: true,
            retry_after: None,
        }
    }

    /// A rate-limit response, optionally carrying the provider's backoff hint.
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        AnycalError::Provider {
            message: message.into(),
            retryable: true,
            retry_after,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnycalError::Provider {
                retryable: true,
                ..
            } | AnycalError::Timeout(_)
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, AnycalError::Auth(_))
    }

    pub fn retry_after_hint(&self) -> Option<u64> {
        match self {
            AnycalError::Provider { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
