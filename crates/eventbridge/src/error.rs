//! Error types for EventBridge operations.
//!
//! Remote failures carry the service error code so callers can tell a
//! throttled call from a missing resource. [`ErrorCategory`] groups codes
//! for retry decisions and user feedback.

use thiserror::Error;

/// Categories of remote errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request rate exceeded (transient, retryable)
    Throttling,
    /// Concurrent modification or resource already exists
    Conflict,
    /// Resource does not exist
    NotFound,
    /// Account quota reached
    LimitExceeded,
    /// Request rejected as malformed
    Validation,
    /// Service-side failure (transient, retryable)
    Internal,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Category for a service error code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ThrottlingException" => Self::Throttling,
            "ConcurrentModificationException" | "ResourceAlreadyExistsException" => Self::Conflict,
            "ResourceNotFoundException" => Self::NotFound,
            "LimitExceededException" => Self::LimitExceeded,
            "ValidationException" | "InvalidEventPatternException" => Self::Validation,
            "InternalException" => Self::Internal,
            _ => Self::Other,
        }
    }

    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttling | Self::Conflict | Self::Internal)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Throttling => "Request throttled",
            Self::Conflict => "Conflicting modification",
            Self::NotFound => "Resource not found",
            Self::LimitExceeded => "Service quota reached",
            Self::Validation => "Request rejected",
            Self::Internal => "Service failure",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Throttling => "Reduce --jobs and run again",
            Self::Conflict => "Wait for the pending change to finish and run again",
            Self::NotFound => "Check that the referenced resource exists",
            Self::LimitExceeded => "Delete unused resources or request a quota increase",
            Self::Validation => "Fix the resource definition in the manifest",
            Self::Internal => "Run again later",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during EventBridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Error returned by the service
    #[error("{operation} failed: {code}: {message}")]
    Api {
        /// Operation that failed (`PutRule`, `TagResource`, ...)
        operation: String,
        /// Service error code (`ResourceNotFoundException`, ...)
        code: String,
        /// Message returned by the service
        message: String,
    },

    /// String that does not parse as an ARN
    #[error("invalid ARN: {0}")]
    InvalidArn(String),

    /// Failure inside the reconciliation engine
    #[error(transparent)]
    Engine(#[from] declarative::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Service error for an operation.
    pub fn api(operation: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// `ResourceNotFoundException` for an operation.
    pub fn not_found(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::api(operation, "ResourceNotFoundException", message)
    }

    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api { code, .. } => ErrorCategory::from_code(code),
            Self::InvalidArn(_) => ErrorCategory::Validation,
            Self::Engine(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether this error reports a missing resource.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

/// Result type for EventBridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code("ThrottlingException"), ErrorCategory::Throttling);
        assert_eq!(
            ErrorCategory::from_code("ResourceAlreadyExistsException"),
            ErrorCategory::Conflict
        );
        assert_eq!(ErrorCategory::from_code("Whatever"), ErrorCategory::Other);
    }

    #[test]
    fn test_retryable() {
        assert!(Error::api("PutRule", "ThrottlingException", "slow down").is_retryable());
        assert!(!Error::not_found("DescribeRule", "missing").is_retryable());
        assert!(Error::not_found("DescribeRule", "missing").is_not_found());
    }

    #[test]
    fn test_display() {
        let err = Error::api("PutTargets", "LimitExceededException", "too many targets");
        assert_eq!(
            err.to_string(),
            "PutTargets failed: LimitExceededException: too many targets"
        );
    }
}
