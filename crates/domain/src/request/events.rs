//! ShiftRequest domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Status transitions of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RequestEvent {
    AcceptedByPoster { at: DateTime<Utc> },
    DeclinedByPoster { at: DateTime<Utc> },
    ApprovedByManager { at: DateTime<Utc> },
    RejectedByManager { at: DateTime<Utc> },
}

impl RequestEvent {
    /// Returns when the transition happened.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RequestEvent::AcceptedByPoster { at }
            | RequestEvent::DeclinedByPoster { at }
            | RequestEvent::ApprovedByManager { at }
            | RequestEvent::RejectedByManager { at } => *at,
        }
    }
}

impl DomainEvent for RequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RequestEvent::AcceptedByPoster { .. } => "RequestAcceptedByPoster",
            RequestEvent::DeclinedByPoster { .. } => "RequestDeclinedByPoster",
            RequestEvent::ApprovedByManager { .. } => "RequestApprovedByManager",
            RequestEvent::RejectedByManager { .. } => "RequestRejectedByManager",
        }
    }
}
