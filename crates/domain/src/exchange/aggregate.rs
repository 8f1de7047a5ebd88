//! ExchangeShift aggregate implementation.

use chrono::{DateTime, Utc};
use common::{BusinessUnitId, ExchangeShiftId, ShiftId, ShiftRequestId, ShiftWindow, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::request::RequestKind;

use super::{ExchangeEvent, ExchangeStatus, PostShift};

/// A shift posted by its owner for another employee to take or swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeShift {
    id: ExchangeShiftId,

    /// The scheduled shift being given away.
    shift_id: ShiftId,

    poster_id: UserId,
    business_unit_id: BusinessUnitId,
    status: ExchangeStatus,

    /// Set once the poster has accepted a request.
    accepted_request_id: Option<ShiftRequestId>,

    window: ShiftWindow,
    position: String,
    poster_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Aggregate for ExchangeShift {
    type Id = ExchangeShiftId;
    type Event = ExchangeEvent;

    fn aggregate_type() -> &'static str {
        "ExchangeShift"
    }

    fn id(&self) -> ExchangeShiftId {
        self.id
    }

    fn apply(&mut self, event: Self::Event) {
        self.updated_at = event.occurred_at();
        match event {
            ExchangeEvent::SelectionStarted { .. } => {
                self.status = ExchangeStatus::PendingSelection;
            }
            ExchangeEvent::ApprovalRequested {
                accepted_request_id,
                ..
            } => {
                self.status = ExchangeStatus::AwaitingManagerApproval;
                self.accepted_request_id = Some(accepted_request_id);
            }
            ExchangeEvent::ExchangeApproved { .. } => {
                self.status = ExchangeStatus::Approved;
            }
            ExchangeEvent::ExchangeRejected { .. } => {
                self.status = ExchangeStatus::Rejected;
            }
            ExchangeEvent::ExchangeCancelled { .. } => {
                self.status = ExchangeStatus::Cancelled;
            }
        }
    }
}

impl ExchangeShift {
    /// Builds the aggregate for a freshly posted shift, in `Open` status.
    pub fn posted(
        id: ExchangeShiftId,
        poster_id: UserId,
        cmd: PostShift,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            shift_id: cmd.shift_id,
            poster_id,
            business_unit_id: cmd.business_unit_id,
            status: ExchangeStatus::Open,
            accepted_request_id: None,
            window: cmd.window,
            position: cmd.position,
            poster_name: cmd.poster_name,
            created_at: now,
            updated_at: now,
        }
    }
}

// Query methods
impl ExchangeShift {
    pub fn shift_id(&self) -> ShiftId {
        self.shift_id
    }

    pub fn poster_id(&self) -> UserId {
        self.poster_id
    }

    pub fn business_unit_id(&self) -> BusinessUnitId {
        self.business_unit_id
    }

    pub fn status(&self) -> ExchangeStatus {
        self.status
    }

    pub fn accepted_request_id(&self) -> Option<ShiftRequestId> {
        self.accepted_request_id
    }

    pub fn window(&self) -> ShiftWindow {
        self.window
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn poster_name(&self) -> &str {
        &self.poster_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if `user` posted this shift.
    pub fn is_posted_by(&self, user: UserId) -> bool {
        self.poster_id == user
    }

    /// Returns true if the exchange is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods (return events)
impl ExchangeShift {
    /// Checks that `requester` may respond to this shift with `kind`.
    ///
    /// Ownership of a swap shift is not known here and is checked against the
    /// scheduling service by the caller.
    pub fn check_request(&self, requester: UserId, kind: &RequestKind) -> Result<(), DomainError> {
        if !self.status.can_receive_requests() {
            return Err(DomainError::invalid_state(
                Self::aggregate_type(),
                self.status,
                "submit a request on",
            ));
        }

        if self.is_posted_by(requester) {
            return Err(DomainError::validation(
                "cannot request a shift you posted yourself",
            ));
        }

        if let RequestKind::SwapShift(offer) = kind
            && offer.shift_id == self.shift_id
        {
            return Err(DomainError::validation(
                "swap shift must differ from the posted shift",
            ));
        }

        Ok(())
    }

    /// Locks the exchange while the poster accepts a request.
    ///
    /// Already being in `PendingSelection` produces no events, so an interrupted
    /// acceptance can be retried.
    pub fn begin_selection(&self, now: DateTime<Utc>) -> Result<Vec<ExchangeEvent>, DomainError> {
        if !self.status.can_accept() {
            return Err(DomainError::invalid_state(
                Self::aggregate_type(),
                self.status,
                "accept a request on",
            ));
        }
        if self.status == ExchangeStatus::PendingSelection {
            return Ok(vec![]);
        }
        Ok(vec![ExchangeEvent::SelectionStarted { at: now }])
    }

    /// Moves the exchange to manager review with the accepted request.
    pub fn request_approval(
        &self,
        accepted_request_id: ShiftRequestId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExchangeEvent>, DomainError> {
        if !self.status.can_await_approval() {
            return Err(DomainError::invalid_state(
                Self::aggregate_type(),
                self.status,
                "request approval for",
            ));
        }

        Ok(vec![ExchangeEvent::ApprovalRequested {
            accepted_request_id,
            at: now,
        }])
    }

    /// Records a manager approval.
    pub fn approve(&self, now: DateTime<Utc>) -> Result<Vec<ExchangeEvent>, DomainError> {
        self.ensure_decidable("approve")?;
        Ok(vec![ExchangeEvent::ExchangeApproved { at: now }])
    }

    /// Records a manager rejection.
    pub fn reject(&self, now: DateTime<Utc>) -> Result<Vec<ExchangeEvent>, DomainError> {
        self.ensure_decidable("reject")?;
        Ok(vec![ExchangeEvent::ExchangeRejected { at: now }])
    }

    /// Withdraws the shift from the marketplace.
    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Vec<ExchangeEvent>, DomainError> {
        if !self.status.can_cancel() {
            return Err(DomainError::invalid_state(
                Self::aggregate_type(),
                self.status,
                "cancel",
            ));
        }

        Ok(vec![ExchangeEvent::ExchangeCancelled { at: now }])
    }

    /// Fails unless the exchange is awaiting a manager decision.
    pub fn ensure_decidable(&self, action: &'static str) -> Result<(), DomainError> {
        if self.status.can_decide() {
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
