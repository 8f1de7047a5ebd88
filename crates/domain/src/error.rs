//! Domain error types.

use thiserror::Error;

/// Errors raised by aggregate guards and input validation.
///
/// Both variants are detected locally, before any backend call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Input is malformed or inconsistent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation is not legal for the aggregate's current status.
    #[error("Invalid state: cannot {action} {entity} in {current} status")]
    InvalidState {
        entity: &'static str,
        current: String,
        action: &'static str,
    },
}

impl DomainError {
    /// Creates a validation error from any displayable message.
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub(crate) fn invalid_state(
        entity: &'static str,
        current: impl std::fmt::Display,
        action: &'static str,
    ) -> Self {
        DomainError::InvalidState {
            entity,
            current: current.to_string(),
            action,
        }
    }
}
