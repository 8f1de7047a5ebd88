//! Shift exchange marketplace orchestration.
//!
//! This crate coordinates the ExchangeShift and ShiftRequest aggregates against a
//! remote scheduling backend:
//! 1. Posting a shift, submitting take/swap requests, poster acceptance, cancellation
//! 2. Rechecking an accepted request for scheduling conflicts
//! 3. Manager approval or rejection
//!
//! The backend is the source of truth. Every mutation is sent with the status the
//! aggregate is expected to be in, so stale transitions from racing actors are
//! refused. Multi-call steps are not transactional: when a later sub-call fails
//! the caller gets a [`PartialFailure`] and must re-fetch before retrying.

pub mod approval;
pub mod backend;
pub mod error;
pub mod identity;
pub mod recheck;
pub mod steps;
pub mod workflow;

pub use approval::{
    ApprovalPolicy, Decision, ExchangeDecision, ManagerApprovalOrchestrator, PendingExchange,
};
pub use backend::{BackendError, InMemorySchedulingBackend, ScheduledShift, SchedulingBackend};
pub use error::{MarketplaceError, PartialFailure, RemoteError, RemoteErrorKind, Result};
pub use identity::{IdentityProvider, StaticIdentityProvider};
pub use recheck::ConflictRecheckService;
pub use workflow::{ExchangeDetails, MarketplaceWorkflow};
