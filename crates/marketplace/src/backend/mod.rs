//! Scheduling backend port and in-memory implementation.

pub mod memory;

pub use memory::InMemorySchedulingBackend;

use async_trait::async_trait;
use common::{
    BusinessUnitId, ExchangeShiftId, Identity, ShiftId, ShiftRequestId, ShiftWindow, UserId,
};
use domain::{
    ExchangeEvent, ExchangeShift, ExchangeStatus, PostShift, RequestEvent, RequestKind,
    RequestStatus, ShiftRequest,
};
use thiserror::Error;

/// Failure signal returned by the scheduling backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The backend refused the input, e.g. a shift that the caller does not own.
    #[error("Rejected by backend: {0}")]
    Rejected(String),

    /// The aggregate was no longer in the status the caller expected.
    #[error("{entity} {id} is {actual}, expected {expected}")]
    StatusConflict {
        entity: &'static str,
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Backend temporarily unavailable: {0}")]
    Transient(String),

    #[error("Backend failure: {0}")]
    Permanent(String),
}

/// A shift as scheduled by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledShift {
    pub id: ShiftId,
    pub owner_id: UserId,
    pub business_unit_id: BusinessUnitId,
    pub window: ShiftWindow,
    pub position: String,
}

/// Remote scheduling and marketplace service.
///
/// Every call is made on behalf of `caller`; the networking layer authenticates
/// it with the caller's bearer token. Mutating calls carry the status the
/// aggregate is expected to be in and fail with `StatusConflict` otherwise.
#[async_trait]
pub trait SchedulingBackend: Send + Sync {
    /// Loads a scheduled shift.
    async fn shift(
        &self,
        caller: &Identity,
        shift_id: ShiftId,
    ) -> Result<ScheduledShift, BackendError>;

    /// Posts one of the caller's shifts to the marketplace.
    async fn create_exchange(
        &self,
        caller: &Identity,
        cmd: PostShift,
    ) -> Result<ExchangeShift, BackendError>;

    async fn exchange(
        &self,
        caller: &Identity,
        id: ExchangeShiftId,
    ) -> Result<ExchangeShift, BackendError>;

    /// Lists exchanges of a business unit, optionally filtered by status.
    async fn exchanges(
        &self,
        caller: &Identity,
        business_unit_id: BusinessUnitId,
        status: Option<ExchangeStatus>,
    ) -> Result<Vec<ExchangeShift>, BackendError>;

    /// Applies exchange events if the exchange is still in `expected` status.
    async fn append_exchange_events(
        &self,
        caller: &Identity,
        id: ExchangeShiftId,
        expected: ExchangeStatus,
        events: Vec<ExchangeEvent>,
    ) -> Result<ExchangeShift, BackendError>;

    /// Creates a pending request from the caller against an open exchange.
    async fn create_request(
        &self,
        caller: &Identity,
        exchange_shift_id: ExchangeShiftId,
        kind: RequestKind,
        requester_name: String,
    ) -> Result<ShiftRequest, BackendError>;

    async fn request(
        &self,
        caller: &Identity,
        id: ShiftRequestId,
    ) -> Result<ShiftRequest, BackendError>;

    async fn requests_for_exchange(
        &self,
        caller: &Identity,
        exchange_shift_id: ExchangeShiftId,
    ) -> Result<Vec<ShiftRequest>, BackendError>;

    async fn requests_by_requester(
        &self,
        caller: &Identity,
        requester_id: UserId,
    ) -> Result<Vec<ShiftRequest>, BackendError>;

    /// Applies request events if the request is still in `expected` status.
    async fn append_request_events(
        &self,
        caller: &Identity,
        id: ShiftRequestId,
        expected: RequestStatus,
        events: Vec<RequestEvent>,
    ) -> Result<ShiftRequest, BackendError>;

    /// Asks the scheduling validator whether executing `request` would leave
    /// both employees without conflicting shifts.
    async fn validate_execution(
        &self,
        caller: &Identity,
        request: &ShiftRequest,
        exchange: &ExchangeShift,
    ) -> Result<bool, BackendError>;
}
