//! Shared types for the shift marketplace workspace.

pub mod identity;
pub mod types;

pub use identity::{Identity, Role};
pub use types::{BusinessUnitId, ExchangeShiftId, ShiftId, ShiftRequestId, ShiftWindow, UserId};
