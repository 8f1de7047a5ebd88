//! ShiftRequest aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::ShiftRequest;
pub use events::RequestEvent;
pub use state::RequestStatus;

use common::{ExchangeShiftId, ShiftId, ShiftWindow};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// How the requester wants to pick up a posted shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    TakeShift,
    SwapShift,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::TakeShift => "TAKE_SHIFT",
            RequestType::SwapShift => "SWAP_SHIFT",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The shift a requester offers in return for a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOffer {
    pub shift_id: ShiftId,
    /// Display fields copied from the scheduling service.
    pub window: Option<ShiftWindow>,
    pub position: Option<String>,
}

impl SwapOffer {
    /// Creates an offer without display details.
    pub fn new(shift_id: ShiftId) -> Self {
        Self {
            shift_id,
            window: None,
            position: None,
        }
    }

    /// Attaches display details.
    pub fn with_details(mut self, window: ShiftWindow, position: impl Into<String>) -> Self {
        self.window = Some(window);
        self.position = Some(position.into());
        self
    }
}

/// Request type together with the data only a swap carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    TakeShift,
    SwapShift(SwapOffer),
}

impl RequestKind {
    pub fn request_type(&self) -> RequestType {
        match self {
            RequestKind::TakeShift => RequestType::TakeShift,
            RequestKind::SwapShift(_) => RequestType::SwapShift,
        }
    }

    /// Returns the offered shift for a swap.
    pub fn swap_shift_id(&self) -> Option<ShiftId> {
        match self {
            RequestKind::TakeShift => None,
            RequestKind::SwapShift(offer) => Some(offer.shift_id),
        }
    }
}

/// Command to respond to a posted shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub exchange_shift_id: ExchangeShiftId,
    pub request_type: RequestType,
    pub swap_shift_id: Option<ShiftId>,
    pub requester_name: String,
}

impl SubmitRequest {
    /// Creates a request to take the shift outright.
    pub fn take(exchange_shift_id: ExchangeShiftId, requester_name: impl Into<String>) -> Self {
        Self {
            exchange_shift_id,
            request_type: RequestType::TakeShift,
            swap_shift_id: None,
            requester_name: requester_name.into(),
        }
    }

    /// Creates a request to swap the shift for one of the requester's own.
    pub fn swap(
        exchange_shift_id: ExchangeShiftId,
        swap_shift_id: Option<ShiftId>,
        requester_name: impl Into<String>,
    ) -> Self {
        Self {
            exchange_shift_id,
            request_type: RequestType::SwapShift,
            swap_shift_id,
            requester_name: requester_name.into(),
        }
    }

    /// Resolves the command into a request kind.
    ///
    /// A swap shift is required for `SwapShift` and forbidden for `TakeShift`.
    pub fn kind(&self) -> Result<RequestKind, DomainError> {
        match (self.request_type, self.swap_shift_id) {
            (RequestType::TakeShift, None) => Ok(RequestKind::TakeShift),
            (RequestType::TakeShift, Some(_)) => Err(DomainError::validation(
                "a take request must not reference a swap shift",
            )),
            (RequestType::SwapShift, Some(shift_id)) => {
                Ok(RequestKind::SwapShift(SwapOffer::new(shift_id)))
            }
            (RequestType::SwapShift, None) => Err(DomainError::validation(
                "a swap request requires a swap shift",
            )),
        }
    }
}
