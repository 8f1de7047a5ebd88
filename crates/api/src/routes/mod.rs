//! HTTP route handlers.

pub mod approvals;
pub mod clock_in;
pub mod exchanges;
pub mod ops;
