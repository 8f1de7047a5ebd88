//! Marketplace error types.

use common::{ExchangeShiftId, ShiftRequestId};
use domain::DomainError;
use thiserror::Error;

use crate::backend::BackendError;

/// Classification of a backend failure, as reported by the networking layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    NotFound,
    /// Worth retrying later (timeouts, unavailable backend).
    Transient,
    Permanent,
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::Transient => "transient",
            RemoteErrorKind::Permanent => "permanent",
        };
        write!(f, "{name}")
    }
}

/// A backend failure surfaced unchanged to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        self.kind == RemoteErrorKind::Transient
    }
}

/// A multi-call workflow step that applied some, but not all, of its sub-calls.
///
/// The affected ExchangeShift and ShiftRequest must be re-fetched before any
/// further mutation; no local projection of them is assumed consistent.
#[derive(Debug, Error)]
#[error(
    "{workflow} stopped at '{failed_step}' after completing {completed_steps:?}; re-fetch exchange {exchange_shift_id} before retrying"
)]
pub struct PartialFailure {
    pub workflow: &'static str,
    pub completed_steps: Vec<String>,
    pub failed_step: String,
    pub exchange_shift_id: ExchangeShiftId,
    pub request_id: Option<ShiftRequestId>,
    #[source]
    pub cause: Box<MarketplaceError>,
}

/// Errors returned by the marketplace orchestrators.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Malformed or inconsistent input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation is not legal for the aggregate's current status.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// No signed-in user or no bearer token.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller is signed in but may not act on this aggregate.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Network or backend failure.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A workflow step completed only some of its sub-calls.
    #[error(transparent)]
    PartialFailure(#[from] PartialFailure),
}

impl MarketplaceError {
    /// Returns true if the caller must re-fetch state before retrying.
    pub fn requires_refetch(&self) -> bool {
        matches!(self, MarketplaceError::PartialFailure(_))
    }
}

impl From<DomainError> for MarketplaceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(message) => MarketplaceError::Validation(message),
            err @ DomainError::InvalidState { .. } => {
                MarketplaceError::InvalidState(err.to_string())
            }
        }
    }
}

impl From<BackendError> for MarketplaceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(message) => MarketplaceError::Validation(message),
            err @ BackendError::StatusConflict { .. } => {
                MarketplaceError::InvalidState(err.to_string())
            }
            err @ BackendError::NotFound { .. } => MarketplaceError::Remote(RemoteError {
                kind: RemoteErrorKind::NotFound,
                message: err.to_string(),
            }),
            BackendError::Transient(message) => MarketplaceError::Remote(RemoteError {
                kind: RemoteErrorKind::Transient,
                message,
            }),
            BackendError::Permanent(message) => MarketplaceError::Remote(RemoteError {
                kind: RemoteErrorKind::Permanent,
                message,
            }),
        }
    }
}

/// Convenience type alias for marketplace results.
pub type Result<T> = std::result::Result<T, MarketplaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_rejection_is_validation() {
        let err: MarketplaceError = BackendError::Rejected("not your shift".to_string()).into();
        assert!(matches!(err, MarketplaceError::Validation(ref m) if m == "not your shift"));
    }

    #[test]
    fn test_status_conflict_is_invalid_state() {
        let err: MarketplaceError = BackendError::StatusConflict {
            entity: "ExchangeShift",
            id: "abc".to_string(),
            expected: "OPEN".to_string(),
            actual: "CANCELLED".to_string(),
        }
        .into();
        assert!(matches!(err, MarketplaceError::InvalidState(_)));
    }

    #[test]
    fn test_transient_is_surfaced_as_remote() {
        let err: MarketplaceError = BackendError::Transient("timeout".to_string()).into();
        match err {
            MarketplaceError::Remote(remote) => {
                assert!(remote.is_transient());
                assert_eq!(remote.to_string(), "transient: timeout");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_domain_errors_keep_their_category() {
        let err: MarketplaceError = DomainError::validation("bad").into();
        assert!(matches!(err, MarketplaceError::Validation(_)));
    }

    #[test]
    fn test_partial_failure_requires_refetch() {
        let err = MarketplaceError::from(PartialFailure {
            workflow: "accept_request",
            completed_steps: vec!["begin_selection".to_string()],
            failed_step: "accept_request".to_string(),
            exchange_shift_id: ExchangeShiftId::new(),
            request_id: None,
            cause: Box::new(BackendError::Transient("down".to_string()).into()),
        });
        assert!(err.requires_refetch());
        assert!(err.to_string().contains("re-fetch exchange"));
    }
}
