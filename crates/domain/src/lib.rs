//! Domain layer for the shift marketplace.
//!
//! This crate provides the pure, synchronous core:
//! - Geofenced clock-in eligibility (Haversine distance against a site radius)
//! - ExchangeShift aggregate: a shift posted to the marketplace and its status machine
//! - ShiftRequest aggregate: a take or swap response and its status machine
//!
//! Aggregates never perform I/O. Each command method checks the status guard and
//! returns the events that the scheduling backend is asked to apply.

pub mod aggregate;
pub mod error;
pub mod exchange;
pub mod geofence;
pub mod request;

pub use aggregate::{Aggregate, DomainEvent};
pub use error::DomainError;
pub use exchange::{ExchangeEvent, ExchangeShift, ExchangeStatus, PostShift};
pub use geofence::{
    BusinessUnitAddress, ClockInEligibility, DEFAULT_ALLOWED_RADIUS_METERS, EARTH_RADIUS_METERS,
    EligibilityReason, Location, evaluate, haversine_distance,
};
pub use request::{
    RequestEvent, RequestKind, RequestStatus, RequestType, ShiftRequest, SubmitRequest, SwapOffer,
};
