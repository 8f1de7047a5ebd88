//! ExchangeShift status machine.

use serde::{Deserialize, Serialize};

/// The status of a posted shift.
///
/// State transitions:
/// ```text
/// Open ──► PendingSelection ──► AwaitingManagerApproval ──┬──► Approved
///  │              │                                       └──► Rejected
///  └──────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeStatus {
    /// Posted and accepting requests.
    #[default]
    Open,

    /// The poster is accepting a request; no new requests are taken.
    PendingSelection,

    /// A request was accepted by the poster and awaits a manager decision.
    AwaitingManagerApproval,

    /// The manager approved the exchange (terminal state).
    Approved,

    /// The manager rejected the exchange (terminal state).
    Rejected,

    /// The poster withdrew the shift (terminal state).
    Cancelled,
}

impl ExchangeStatus {
    /// Returns true if new requests may be submitted.
    pub fn can_receive_requests(&self) -> bool {
        matches!(self, ExchangeStatus::Open)
    }

    /// Returns true if the poster may accept a request.
    pub fn can_accept(&self) -> bool {
        matches!(
            self,
            ExchangeStatus::Open | ExchangeStatus::PendingSelection
        )
    }

    /// Returns true if the exchange may move to manager review.
    pub fn can_await_approval(&self) -> bool {
        matches!(self, ExchangeStatus::PendingSelection)
    }

    /// Returns true if a manager may approve or reject.
    pub fn can_decide(&self) -> bool {
        matches!(self, ExchangeStatus::AwaitingManagerApproval)
    }

    /// Returns true if the poster may withdraw the shift.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            ExchangeStatus::Open | ExchangeStatus::PendingSelection
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExchangeStatus::Approved | ExchangeStatus::Rejected | ExchangeStatus::Cancelled
        )
    }

    /// Returns the status name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Open => "OPEN",
            ExchangeStatus::PendingSelection => "PENDING_SELECTION",
            ExchangeStatus::AwaitingManagerApproval => "AWAITING_MANAGER_APPROVAL",
            ExchangeStatus::Approved => "APPROVED",
            ExchangeStatus::Rejected => "REJECTED",
            ExchangeStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
