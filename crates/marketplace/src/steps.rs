//! Multi-call workflow names and step tracking.

use common::{ExchangeShiftId, ShiftRequestId};

use crate::error::{MarketplaceError, PartialFailure};

/// Workflow name: poster accepts a request.
pub const WORKFLOW_ACCEPT_REQUEST: &str = "accept_request";

/// Workflow name: finish an interrupted acceptance.
pub const WORKFLOW_RESUME_ACCEPTANCE: &str = "resume_acceptance";

/// Workflow name: manager approves an exchange.
pub const WORKFLOW_APPROVE_EXCHANGE: &str = "approve_exchange";

/// Workflow name: manager rejects an exchange.
pub const WORKFLOW_REJECT_EXCHANGE: &str = "reject_exchange";

/// Step name: lock the exchange in PENDING_SELECTION.
pub const STEP_BEGIN_SELECTION: &str = "begin_selection";

/// Step name: mark the chosen request ACCEPTED_BY_POSTER.
pub const STEP_ACCEPT_REQUEST: &str = "accept_request";

/// Step name: re-read the requests of a locked exchange.
pub const STEP_LOAD_SIBLINGS: &str = "load_siblings";

/// Step name prefix: mark a sibling request DECLINED_BY_POSTER.
pub const STEP_DECLINE_SIBLING: &str = "decline_sibling";

/// Step name: move the exchange to AWAITING_MANAGER_APPROVAL.
pub const STEP_REQUEST_APPROVAL: &str = "request_approval";

/// Step name: record the manager decision on the exchange.
pub const STEP_DECIDE_EXCHANGE: &str = "decide_exchange";

/// Step name: record the manager decision on the request.
pub const STEP_DECIDE_REQUEST: &str = "decide_request";

/// Records the sub-calls of one workflow step.
///
/// A failure before anything was applied is returned as is; a failure after
/// at least one applied sub-call becomes a [`PartialFailure`].
#[derive(Debug)]
pub(crate) struct StepLog {
    workflow: &'static str,
    exchange_shift_id: ExchangeShiftId,
    request_id: Option<ShiftRequestId>,
    completed: Vec<String>,
}

impl StepLog {
    pub(crate) fn new(
        workflow: &'static str,
        exchange_shift_id: ExchangeShiftId,
        request_id: Option<ShiftRequestId>,
    ) -> Self {
        Self {
            workflow,
            exchange_shift_id,
            request_id,
            completed: Vec::new(),
        }
    }

    pub(crate) fn complete(&mut self, step: impl Into<String>) {
        self.completed.push(step.into());
    }

    /// Converts the failure of `step` into the error returned to the caller.
    pub(crate) fn fail(&self, step: impl Into<String>, cause: MarketplaceError) -> MarketplaceError {
        let failed_step = step.into();
        if self.completed.is_empty() {
            return cause;
        }

        metrics::counter!("marketplace_partial_failures_total", "workflow" => self.workflow)
            .increment(1);
        tracing::warn!(
            workflow = self.workflow,
            exchange_shift_id = %self.exchange_shift_id,
            completed = ?self.completed,
            failed_step = %failed_step,
            error = %cause,
            "workflow step partially applied"
        );

        PartialFailure {
            workflow: self.workflow,
            completed_steps: self.completed.clone(),
            failed_step,
            exchange_shift_id: self.exchange_shift_id,
            request_id: self.request_id,
            cause: Box::new(cause),
        }
        .into()
    }
}

/// Step name for declining one sibling request.
pub(crate) fn decline_step(request_id: ShiftRequestId) -> String {
    format!("{STEP_DECLINE_SIBLING}:{request_id}")
}
