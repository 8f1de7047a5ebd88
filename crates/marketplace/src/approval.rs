//! Manager approval orchestrator.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{Identity, ShiftRequestId};
use domain::{
    Aggregate, DomainError, ExchangeShift, ExchangeStatus, RequestEvent, RequestStatus,
    ShiftRequest,
};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::backend::SchedulingBackend;
use crate::error::{MarketplaceError, Result};
use crate::identity::{IdentityProvider, require_identity};
use crate::recheck::ConflictRecheckService;
use crate::steps::{
    STEP_DECIDE_EXCHANGE, STEP_DECIDE_REQUEST, StepLog, WORKFLOW_APPROVE_EXCHANGE,
    WORKFLOW_REJECT_EXCHANGE,
};

/// How a failed conflict recheck affects approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApprovalPolicy {
    /// Refuse approval when the fresh recheck reports a conflict.
    pub block_on_conflict: bool,
}

impl ApprovalPolicy {
    pub fn strict() -> Self {
        Self {
            block_on_conflict: true,
        }
    }
}

/// A manager's decision on an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }

    fn workflow(&self) -> &'static str {
        match self {
            Decision::Approve => WORKFLOW_APPROVE_EXCHANGE,
            Decision::Reject => WORKFLOW_REJECT_EXCHANGE,
        }
    }

    fn exchange_outcome(&self) -> ExchangeStatus {
        match self {
            Decision::Approve => ExchangeStatus::Approved,
            Decision::Reject => ExchangeStatus::Rejected,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An exchange awaiting a manager, paired with its accepted request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingExchange {
    pub exchange: ExchangeShift,
    pub request: ShiftRequest,
}

/// Both aggregates after a manager decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeDecision {
    pub exchange: ExchangeShift,
    pub request: ShiftRequest,
}

/// Lists pending exchanges and applies manager decisions.
///
/// One orchestrator value is one approval session: recheck results are kept
/// for its lifetime and dropped with it.
pub struct ManagerApprovalOrchestrator<B, I>
where
    B: SchedulingBackend + Clone,
    I: IdentityProvider,
{
    backend: B,
    identity: I,
    recheck: ConflictRecheckService<B>,
    policy: ApprovalPolicy,
    rechecks: RwLock<HashMap<ShiftRequestId, bool>>,
}

impl<B, I> ManagerApprovalOrchestrator<B, I>
where
    B: SchedulingBackend + Clone,
    I: IdentityProvider,
{
    pub fn new(backend: B, identity: I) -> Self {
        Self {
            recheck: ConflictRecheckService::new(backend.clone()),
            backend,
            identity,
            policy: ApprovalPolicy::default(),
            rechecks: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Exchanges awaiting approval in the manager's business unit, oldest first.
    ///
    /// Each request carries the recheck result of this session, or none.
    #[tracing::instrument(skip(self))]
    pub async fn get_pending_exchanges(&self) -> Result<Vec<PendingExchange>> {
        let caller = require_identity(&self.identity)?;
        self.load_pending(&caller).await
    }

    /// Rechecks every pending exchange and returns the refreshed list.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_pending_exchanges(&self) -> Result<Vec<PendingExchange>> {
        let caller = require_identity(&self.identity)?;
        let mut pending = self.load_pending(&caller).await?;

        for item in &mut pending {
            let checked = self
                .recheck
                .recheck(&caller, item.request.id(), &item.exchange)
                .await?;
            self.remember(&checked).await;
            item.request = checked;
        }
        Ok(pending)
    }

    /// Rechecks one accepted request.
    #[tracing::instrument(skip(self))]
    pub async fn recheck(&self, request_id: ShiftRequestId) -> Result<ShiftRequest> {
        let caller = require_identity(&self.identity)?;
        let request = self.backend.request(&caller, request_id).await?;
        let exchange = self.unit_exchange(&caller, &request).await?;

        let checked = self.recheck.recheck(&caller, request_id, &exchange).await?;
        self.remember(&checked).await;
        Ok(checked)
    }

    /// Approves the exchange of an accepted request after a fresh recheck.
    #[tracing::instrument(skip(self))]
    pub async fn approve_exchange(&self, request_id: ShiftRequestId) -> Result<ExchangeDecision> {
        self.decide(request_id, Decision::Approve).await
    }

    /// Rejects the exchange of an accepted request.
    #[tracing::instrument(skip(self))]
    pub async fn reject_exchange(&self, request_id: ShiftRequestId) -> Result<ExchangeDecision> {
        self.decide(request_id, Decision::Reject).await
    }

    async fn decide(
        &self,
        request_id: ShiftRequestId,
        decision: Decision,
    ) -> Result<ExchangeDecision> {
        let caller = require_identity(&self.identity)?;
        let started = std::time::Instant::now();
        let now = Utc::now();

        let request = self.backend.request(&caller, request_id).await?;
        let exchange = self.unit_exchange(&caller, &request).await?;

        // The exchange already carries this decision but the request does not.
        if exchange.status() == decision.exchange_outcome()
            && exchange.accepted_request_id() == Some(request_id)
            && request.status() == RequestStatus::AcceptedByPoster
        {
            tracing::info!(%request_id, %decision, "completing interrupted decision");
            let log = StepLog::new(decision.workflow(), exchange.id(), Some(request_id));
            return self
                .finish_decision(&caller, exchange, request, decision, log)
                .await;
        }

        exchange.ensure_decidable(decision.as_str())?;
        if exchange.accepted_request_id() != Some(request_id) {
            return Err(MarketplaceError::Validation(format!(
                "request {request_id} is not the accepted request of exchange {}",
                exchange.id()
            )));
        }
        let exchange_events = match decision {
            Decision::Approve => exchange.approve(now)?,
            Decision::Reject => exchange.reject(now)?,
        };
        decision_events(&request, decision, now)?;

        if decision == Decision::Approve {
            let checked = self.recheck.recheck(&caller, request_id, &exchange).await?;
            self.remember(&checked).await;
            if checked.is_execution_possible() == Some(false) {
                if self.policy.block_on_conflict {
                    return Err(MarketplaceError::Validation(format!(
                        "exchange {} would create a scheduling conflict",
                        exchange.id()
                    )));
                }
                tracing::warn!(%request_id, "approving despite a scheduling conflict");
            }
        }

        let mut log = StepLog::new(decision.workflow(), exchange.id(), Some(request_id));
        let exchange = self
            .backend
            .append_exchange_events(
                &caller,
                exchange.id(),
                ExchangeStatus::AwaitingManagerApproval,
                exchange_events,
            )
            .await
            .map_err(|err| log.fail(STEP_DECIDE_EXCHANGE, err.into()))?;
        log.complete(STEP_DECIDE_EXCHANGE);

        let outcome = self
            .finish_decision(&caller, exchange, request, decision, log)
            .await?;

        metrics::histogram!(
            "marketplace_workflow_duration_seconds",
            "workflow" => decision.workflow()
        )
        .record(started.elapsed().as_secs_f64());
        Ok(outcome)
    }

    async fn finish_decision(
        &self,
        caller: &Identity,
        exchange: ExchangeShift,
        request: ShiftRequest,
        decision: Decision,
        mut log: StepLog,
    ) -> Result<ExchangeDecision> {
        let events = decision_events(&request, decision, Utc::now())
            .map_err(|err| log.fail(STEP_DECIDE_REQUEST, err.into()))?;

        let mut request = self
            .backend
            .append_request_events(caller, request.id(), RequestStatus::AcceptedByPoster, events)
            .await
            .map_err(|err| log.fail(STEP_DECIDE_REQUEST, err.into()))?;
        log.complete(STEP_DECIDE_REQUEST);
        request.set_execution_check(self.rechecks.read().await.get(&request.id()).copied());

        metrics::counter!("marketplace_exchanges_decided_total", "decision" => decision.as_str())
            .increment(1);
        tracing::info!(
            exchange_shift_id = %exchange.id(),
            request_id = %request.id(),
            %decision,
            "exchange decided"
        );
        Ok(ExchangeDecision { exchange, request })
    }

    async fn load_pending(&self, caller: &Identity) -> Result<Vec<PendingExchange>> {
        let exchanges = self
            .backend
            .exchanges(
                caller,
                caller.business_unit_id,
                Some(ExchangeStatus::AwaitingManagerApproval),
            )
            .await?;

        let rechecks = self.rechecks.read().await.clone();
        let mut pending = Vec::with_capacity(exchanges.len());
        for exchange in exchanges {
            let Some(request_id) = exchange.accepted_request_id() else {
                tracing::warn!(
                    exchange_shift_id = %exchange.id(),
                    "exchange awaits approval without an accepted request"
                );
                continue;
            };
            let mut request = self.backend.request(caller, request_id).await?;
            request.set_execution_check(rechecks.get(&request_id).copied());
            pending.push(PendingExchange { exchange, request });
        }

        pending.sort_by_key(|item| (item.exchange.created_at(), item.exchange.id()));
        Ok(pending)
    }

    /// Loads the exchange of `request`, refusing exchanges of other business units.
    async fn unit_exchange(
        &self,
        caller: &Identity,
        request: &ShiftRequest,
    ) -> Result<ExchangeShift> {
        let exchange = self
            .backend
            .exchange(caller, request.exchange_shift_id())
            .await?;
        if exchange.business_unit_id() != caller.business_unit_id {
            return Err(MarketplaceError::Forbidden(format!(
                "exchange {} belongs to another business unit",
                exchange.id()
            )));
        }
        Ok(exchange)
    }

    async fn remember(&self, request: &ShiftRequest) {
        if let Some(possible) = request.is_execution_possible() {
            self.rechecks.write().await.insert(request.id(), possible);
        }
    }
}

fn decision_events(
    request: &ShiftRequest,
    decision: Decision,
    now: DateTime<Utc>,
) -> std::result::Result<Vec<RequestEvent>, DomainError> {
    match decision {
        Decision::Approve => request.approve_by_manager(now),
        Decision::Reject => request.reject_by_manager(now),
    }
}
