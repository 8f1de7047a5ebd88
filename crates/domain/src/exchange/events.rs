//! ExchangeShift domain events.

use chrono::{DateTime, Utc};
use common::ShiftRequestId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Status transitions of a posted shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ExchangeEvent {
    /// The poster started accepting a request.
    SelectionStarted { at: DateTime<Utc> },

    /// A request was accepted by the poster and the exchange awaits review.
    ApprovalRequested {
        accepted_request_id: ShiftRequestId,
        at: DateTime<Utc>,
    },

    /// A manager approved the exchange.
    ExchangeApproved { at: DateTime<Utc> },

    /// A manager rejected the exchange.
    ExchangeRejected { at: DateTime<Utc> },

    /// The poster withdrew the shift.
    ExchangeCancelled { at: DateTime<Utc> },
}

impl ExchangeEvent {
    /// Returns when the transition happened.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ExchangeEvent::SelectionStarted { at }
            | ExchangeEvent::ApprovalRequested { at, .. }
            | ExchangeEvent::ExchangeApproved { at }
            | ExchangeEvent::ExchangeRejected { at }
            | ExchangeEvent::ExchangeCancelled { at } => *at,
        }
    }
}

impl DomainEvent for ExchangeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExchangeEvent::SelectionStarted { .. } => "SelectionStarted",
            ExchangeEvent::ApprovalRequested { .. } => "ApprovalRequested",
            ExchangeEvent::ExchangeApproved { .. } => "ExchangeApproved",
            ExchangeEvent::ExchangeRejected { .. } => "ExchangeRejected",
            ExchangeEvent::ExchangeCancelled { .. } => "ExchangeCancelled",
        }
    }
}
