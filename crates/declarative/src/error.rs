//! Error types for the reconciliation engine.
//!
//! Caller mistakes and lifecycle waits are not errors here; they are
//! reported as [`Outcome::Rejected`](crate::types::Outcome::Rejected) and
//! [`Outcome::Deferred`](crate::types::Outcome::Deferred). What remains is
//! the engine failing to move a spec in or out of its serialized form.

use thiserror::Error;

/// Errors raised by the engine itself
#[derive(Debug, Error)]
pub enum Error {
    /// A spec or request could not be converted to or from JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A spec serialized to something other than an object
    #[error("{kind} spec did not serialize to an object")]
    NotAnObject {
        /// Resource kind being processed
        kind: &'static str,
    },

    /// A planned step was run against snapshots it was not planned for
    #[error("cannot {step} {kind} with desired {desired} and latest {latest}")]
    StepMismatch {
        kind: &'static str,
        step: &'static str,
        desired: &'static str,
        latest: &'static str,
    },
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// A desired spec that fails shape validation
///
/// Displayed as `invalid Spec: "<field>": <message>` when a field is named,
/// or as the bare message otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    /// Error tied to a spec field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Error not tied to a single field
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "invalid Spec: {field:?}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}
