//! ShiftRequest aggregate implementation.

use chrono::{DateTime, Utc};
use common::{ExchangeShiftId, ShiftRequestId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::error::DomainError;

use super::{RequestEvent, RequestKind, RequestStatus, RequestType};

/// A response from another employee to a posted shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRequest {
    id: ShiftRequestId,
    exchange_shift_id: ExchangeShiftId,
    requester_id: UserId,
    kind: RequestKind,
    status: RequestStatus,
    requester_name: String,

    /// Result of the most recent conflict recheck. `None` means not checked yet,
    /// which is different from a known conflict.
    is_execution_possible: Option<bool>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Aggregate for ShiftRequest {
    type Id = ShiftRequestId;
    type Event = RequestEvent;

    fn aggregate_type() -> &'static str {
        "ShiftRequest"
    }

    fn id(&self) -> ShiftRequestId {
        self.id
    }

    fn apply(&mut self, event: Self::Event) {
        self.updated_at = event.occurred_at();
        self.status = match event {
            RequestEvent::AcceptedByPoster { .. } => RequestStatus::AcceptedByPoster,
            RequestEvent::DeclinedByPoster { .. } => RequestStatus::DeclinedByPoster,
            RequestEvent::ApprovedByManager { .. } => RequestStatus::ApprovedByManager,
            RequestEvent::RejectedByManager { .. } => RequestStatus::RejectedByManager,
        };
    }
}

impl ShiftRequest {
    /// Builds the aggregate for a freshly submitted request, in `Pending` status.
    pub fn submitted(
        id: ShiftRequestId,
        exchange_shift_id: ExchangeShiftId,
        requester_id: UserId,
        kind: RequestKind,
        requester_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            exchange_shift_id,
            requester_id,
            kind,
            status: RequestStatus::Pending,
            requester_name: requester_name.into(),
            is_execution_possible: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy carrying a fresh conflict recheck result.
    pub fn with_execution_check(mut self, possible: bool) -> Self {
        self.is_execution_possible = Some(possible);
        self
    }

    /// Replaces the recheck result, `None` marking it unknown.
    pub fn set_execution_check(&mut self, possible: Option<bool>) {
        self.is_execution_possible = possible;
    }
}

// Query methods
impl ShiftRequest {
    pub fn exchange_shift_id(&self) -> ExchangeShiftId {
        self.exchange_shift_id
    }

    pub fn requester_id(&self) -> UserId {
        self.requester_id
    }

    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    pub fn request_type(&self) -> RequestType {
        self.kind.request_type()
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn requester_name(&self) -> &str {
        &self.requester_name
    }

    pub fn is_execution_possible(&self) -> Option<bool> {
        self.is_execution_possible
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

// Command methods (return events)
impl ShiftRequest {
    /// The poster chooses this request.
    pub fn accept_by_poster(&self, now: DateTime<Utc>) -> Result<Vec<RequestEvent>, DomainError> {
        self.ensure(self.status.can_poster_decide(), "accept")?;
        Ok(vec![RequestEvent::AcceptedByPoster { at: now }])
    }

    /// The poster chose another request.
    pub fn decline_by_poster(&self, now: DateTime<Utc>) -> Result<Vec<RequestEvent>, DomainError> {
        self.ensure(self.status.can_poster_decide(), "decline")?;
        Ok(vec![RequestEvent::DeclinedByPoster { at: now }])
    }

    /// A manager approves the accepted request.
    pub fn approve_by_manager(&self, now: DateTime<Utc>) -> Result<Vec<RequestEvent>, DomainError> {
        self.ensure(self.status.can_manager_decide(), "approve")?;
        Ok(vec![RequestEvent::ApprovedByManager { at: now }])
    }

    /// A manager rejects the accepted request.
    pub fn reject_by_manager(&self, now: DateTime<Utc>) -> Result<Vec<RequestEvent>, DomainError> {
        self.ensure(self.status.can_manager_decide(), "reject")?;
        Ok(vec![RequestEvent::RejectedByManager { at: now }])
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), DomainError> {
        if allowed {
            Ok(())
        } else {
            Err(DomainError::invalid_state(
                Self::aggregate_type(),
                self.status,
                action,
            ))
        }
    }
}
