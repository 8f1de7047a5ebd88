//! Geofenced clock-in.
//!
//! Connects a [`GeolocationProvider`] (permission prompts, position fixes, live
//! updates) to the pure eligibility evaluator in the domain crate. Waiting for a
//! fix is bounded by [`ClockInConfig::location_timeout`]; a wait that times out or
//! is abandoned yields `LOCATION_UNAVAILABLE`.

pub mod provider;
pub mod service;

pub use provider::{
    GeolocationProvider, InMemoryGeolocationProvider, LocationResult, LocationStream,
    PermissionResult,
};
pub use service::{ClockInConfig, ClockInService, EligibilityStream};
