//! ShiftRequest status machine.

use serde::{Deserialize, Serialize};

/// The status of a take or swap request.
///
/// State transitions:
/// ```text
/// Pending ──┬──► AcceptedByPoster ──┬──► ApprovedByManager
///           │                       └──► RejectedByManager
///           └──► DeclinedByPoster
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Waiting for the poster to decide.
    #[default]
    Pending,

    /// Chosen by the poster, awaiting a manager decision.
    AcceptedByPoster,

    /// Not chosen by the poster (terminal state).
    DeclinedByPoster,

    /// Approved by a manager (terminal state).
    ApprovedByManager,

    /// Rejected by a manager (terminal state).
    RejectedByManager,
}

impl RequestStatus {
    /// Returns true if the poster may accept or decline the request.
    pub fn can_poster_decide(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }

    /// Returns true if a manager may approve or reject the request.
    pub fn can_manager_decide(&self) -> bool {
        matches!(self, RequestStatus::AcceptedByPoster)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::DeclinedByPoster
                | RequestStatus::ApprovedByManager
                | RequestStatus::RejectedByManager
        )
    }

    /// Returns the status name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::AcceptedByPoster => "ACCEPTED_BY_POSTER",
            RequestStatus::DeclinedByPoster => "DECLINED_BY_POSTER",
            RequestStatus::ApprovedByManager => "APPROVED_BY_MANAGER",
            RequestStatus::RejectedByManager => "REJECTED_BY_MANAGER",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert_eq!(RequestStatus::default(), RequestStatus::Pending);
    }

    #[test]
    fn test_decision_guards() {
        assert!(RequestStatus::Pending.can_poster_decide());
        assert!(!RequestStatus::AcceptedByPoster.can_poster_decide());
        assert!(!RequestStatus::DeclinedByPoster.can_poster_decide());

        assert!(RequestStatus::AcceptedByPoster.can_manager_decide());
        assert!(!RequestStatus::Pending.can_manager_decide());
        assert!(!RequestStatus::ApprovedByManager.can_manager_decide());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::AcceptedByPoster.is_terminal());
        assert!(RequestStatus::DeclinedByPoster.is_terminal());
        assert!(RequestStatus::ApprovedByManager.is_terminal());
        assert!(RequestStatus::RejectedByManager.is_terminal());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&RequestStatus::DeclinedByPoster).unwrap();
        assert_eq!(json, "\"DECLINED_BY_POSTER\"");
        let parsed: RequestStatus = serde_json::from_str("\"ACCEPTED_BY_POSTER\"").unwrap();
        assert_eq!(parsed, RequestStatus::AcceptedByPoster);
    }
}
