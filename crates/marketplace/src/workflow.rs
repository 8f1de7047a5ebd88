//! Marketplace workflow orchestrator: posting, requesting, acceptance, cancellation.

use chrono::Utc;
use common::{ExchangeShiftId, Identity, ShiftRequestId};
use domain::{
    Aggregate, ExchangeShift, ExchangeStatus, PostShift, RequestKind, RequestStatus,
    ShiftRequest, SubmitRequest,
};
use serde::Serialize;

use crate::backend::{BackendError, SchedulingBackend};
use crate::error::{MarketplaceError, Result};
use crate::identity::{IdentityProvider, require_identity};
use crate::steps::{
    STEP_ACCEPT_REQUEST, STEP_BEGIN_SELECTION, STEP_LOAD_SIBLINGS, STEP_REQUEST_APPROVAL, StepLog,
    WORKFLOW_ACCEPT_REQUEST, WORKFLOW_RESUME_ACCEPTANCE, decline_step,
};

/// An exchange together with the requests the caller may see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeDetails {
    pub exchange: ExchangeShift,
    pub requests: Vec<ShiftRequest>,
}

/// Coordinates the ExchangeShift and ShiftRequest aggregates for employees.
///
/// Status guards are checked locally on the freshly fetched aggregate before
/// any mutating call, and again by the backend through the expected status
/// sent with every update.
pub struct MarketplaceWorkflow<B, I>
where
    B: SchedulingBackend,
    I: IdentityProvider,
{
    backend: B,
    identity: I,
}

impl<B, I> MarketplaceWorkflow<B, I>
where
    B: SchedulingBackend,
    I: IdentityProvider,
{
    pub fn new(backend: B, identity: I) -> Self {
        Self { backend, identity }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Posts one of the caller's shifts to the marketplace.
    #[tracing::instrument(skip(self, cmd), fields(shift_id = %cmd.shift_id))]
    pub async fn post_shift(&self, cmd: PostShift) -> Result<ExchangeShift> {
        let caller = require_identity(&self.identity)?;
        cmd.validate(Utc::now())?;

        let exchange = self.backend.create_exchange(&caller, cmd).await?;

        metrics::counter!("marketplace_shifts_posted_total").increment(1);
        tracing::info!(exchange_shift_id = %exchange.id(), "shift posted");
        Ok(exchange)
    }

    /// Submits a take or swap request against an open exchange.
    #[tracing::instrument(
        skip(self, cmd),
        fields(exchange_shift_id = %cmd.exchange_shift_id, request_type = %cmd.request_type)
    )]
    pub async fn submit_request(&self, cmd: SubmitRequest) -> Result<ShiftRequest> {
        let caller = require_identity(&self.identity)?;
        let mut kind = cmd.kind()?;

        let exchange = self.backend.exchange(&caller, cmd.exchange_shift_id).await?;
        exchange.check_request(caller.user_id, &kind)?;

        if let RequestKind::SwapShift(offer) = &mut kind {
            let shift = match self.backend.shift(&caller, offer.shift_id).await {
                Ok(shift) => shift,
                Err(BackendError::NotFound { .. }) => {
                    return Err(MarketplaceError::Validation(format!(
                        "swap shift {} does not exist",
                        offer.shift_id
                    )));
                }
                Err(err) => return Err(err.into()),
            };
            if shift.owner_id != caller.user_id {
                return Err(MarketplaceError::Validation(format!(
                    "swap shift {} is not assigned to you",
                    offer.shift_id
                )));
            }
            *offer = offer.clone().with_details(shift.window, shift.position);
        }

        let requester_name = if cmd.requester_name.trim().is_empty() {
            caller.display_name.clone()
        } else {
            cmd.requester_name
        };
        let request = self
            .backend
            .create_request(&caller, exchange.id(), kind, requester_name)
            .await?;

        metrics::counter!(
            "marketplace_requests_submitted_total",
            "request_type" => request.request_type().as_str()
        )
        .increment(1);
        tracing::info!(request_id = %request.id(), "request submitted");
        Ok(request)
    }

    /// The poster accepts one request.
    ///
    /// Locks the exchange in `PENDING_SELECTION`, accepts the request, declines
    /// every other pending request, then moves the exchange to
    /// `AWAITING_MANAGER_APPROVAL`. Siblings are read again once the lock is
    /// held, so requests submitted while the exchange was still `OPEN` are
    /// declined too. A failure after the first applied sub-call is reported as
    /// a partial failure; the exchange stays locked and the acceptance can be
    /// resumed.
    #[tracing::instrument(skip(self))]
    pub async fn accept_request(
        &self,
        exchange_shift_id: ExchangeShiftId,
        request_id: ShiftRequestId,
    ) -> Result<ShiftRequest> {
        let caller = require_identity(&self.identity)?;
        let started = std::time::Instant::now();
        let now = Utc::now();

        let exchange = self.poster_exchange(&caller, exchange_shift_id).await?;
        let selection_events = exchange.begin_selection(now)?;

        let requests = self
            .backend
            .requests_for_exchange(&caller, exchange_shift_id)
            .await?;
        let Some(request) = requests.iter().find(|request| request.id() == request_id) else {
            return Err(MarketplaceError::Validation(format!(
                "request {request_id} does not belong to exchange {exchange_shift_id}"
            )));
        };
        if let Some(earlier) = requests.iter().find(|other| {
            other.status() == RequestStatus::AcceptedByPoster && other.id() != request_id
        }) {
            return Err(MarketplaceError::InvalidState(format!(
                "request {} was already accepted for exchange {exchange_shift_id}; resume the acceptance instead",
                earlier.id()
            )));
        }
        let accept_events = request.accept_by_poster(now)?;

        let mut log = StepLog::new(WORKFLOW_ACCEPT_REQUEST, exchange_shift_id, Some(request_id));

        let exchange = if selection_events.is_empty() {
            exchange
        } else {
            let locked = self
                .backend
                .append_exchange_events(
                    &caller,
                    exchange_shift_id,
                    ExchangeStatus::Open,
                    selection_events,
                )
                .await
                .map_err(|err| log.fail(STEP_BEGIN_SELECTION, err.into()))?;
            log.complete(STEP_BEGIN_SELECTION);
            locked
        };

        let accepted = self
            .backend
            .append_request_events(&caller, request_id, RequestStatus::Pending, accept_events)
            .await
            .map_err(|err| log.fail(STEP_ACCEPT_REQUEST, err.into()))?;
        log.complete(STEP_ACCEPT_REQUEST);

        let (_, declined) = self
            .finish_selection(&caller, &exchange, request_id, &mut log)
            .await?;

        metrics::counter!("marketplace_requests_accepted_total").increment(1);
        metrics::histogram!(
            "marketplace_workflow_duration_seconds",
            "workflow" => WORKFLOW_ACCEPT_REQUEST
        )
        .record(started.elapsed().as_secs_f64());
        tracing::info!(%request_id, declined, "request accepted");
        Ok(accepted)
    }

    /// Finishes an acceptance that stopped after the request was accepted.
    ///
    /// Requires the exchange to be in `PENDING_SELECTION` with exactly one
    /// accepted request.
    #[tracing::instrument(skip(self))]
    pub async fn resume_acceptance(
        &self,
        exchange_shift_id: ExchangeShiftId,
    ) -> Result<ExchangeShift> {
        let caller = require_identity(&self.identity)?;
        let exchange = self.poster_exchange(&caller, exchange_shift_id).await?;
        if exchange.status() != ExchangeStatus::PendingSelection {
            return Err(MarketplaceError::InvalidState(format!(
                "cannot resume acceptance of ExchangeShift in {} status",
                exchange.status()
            )));
        }

        let requests = self
            .backend
            .requests_for_exchange(&caller, exchange_shift_id)
            .await?;
        let accepted_requests: Vec<&ShiftRequest> = requests
            .iter()
            .filter(|request| request.status() == RequestStatus::AcceptedByPoster)
            .collect();
        let [accepted] = accepted_requests.as_slice() else {
            return Err(MarketplaceError::InvalidState(format!(
                "exchange {exchange_shift_id} has {} accepted requests, expected exactly one",
                accepted_requests.len()
            )));
        };
        let accepted_id = accepted.id();

        let mut log = StepLog::new(
            WORKFLOW_RESUME_ACCEPTANCE,
            exchange_shift_id,
            Some(accepted_id),
        );
        let (exchange, declined) = self
            .finish_selection(&caller, &exchange, accepted_id, &mut log)
            .await?;

        tracing::info!(
            %exchange_shift_id,
            request_id = %accepted_id,
            declined,
            "acceptance resumed"
        );
        Ok(exchange)
    }

    /// Withdraws a posted shift. Pending requests are left as they are.
    ///
    /// A locked exchange whose acceptance already went through for one request
    /// cannot be cancelled: that request could never leave
    /// `ACCEPTED_BY_POSTER`. The acceptance has to be resumed instead.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_exchange_shift(
        &self,
        exchange_shift_id: ExchangeShiftId,
    ) -> Result<ExchangeShift> {
        let caller = require_identity(&self.identity)?;
        let exchange = self.poster_exchange(&caller, exchange_shift_id).await?;
        let events = exchange.cancel(Utc::now())?;

        if exchange.status() == ExchangeStatus::PendingSelection {
            let requests = self
                .backend
                .requests_for_exchange(&caller, exchange_shift_id)
                .await?;
            if let Some(accepted) = requests
                .iter()
                .find(|request| request.status() == RequestStatus::AcceptedByPoster)
            {
                return Err(MarketplaceError::InvalidState(format!(
                    "request {} was already accepted for exchange {exchange_shift_id}; resume the acceptance instead",
                    accepted.id()
                )));
            }
        }

        let cancelled = self
            .backend
            .append_exchange_events(&caller, exchange_shift_id, exchange.status(), events)
            .await?;

        metrics::counter!("marketplace_exchanges_cancelled_total").increment(1);
        tracing::info!(%exchange_shift_id, from = %exchange.status(), "exchange cancelled");
        Ok(cancelled)
    }

    /// Lists open exchanges in the caller's business unit, other than their own.
    #[tracing::instrument(skip(self))]
    pub async fn list_open_exchanges(&self) -> Result<Vec<ExchangeShift>> {
        let caller = require_identity(&self.identity)?;
        let exchanges = self
            .backend
            .exchanges(&caller, caller.business_unit_id, Some(ExchangeStatus::Open))
            .await?;

        Ok(exchanges
            .into_iter()
            .filter(|exchange| !exchange.is_posted_by(caller.user_id))
            .collect())
    }

    /// Loads an exchange with its requests.
    ///
    /// The poster and managers see every request; anyone else only their own.
    #[tracing::instrument(skip(self))]
    pub async fn exchange_details(
        &self,
        exchange_shift_id: ExchangeShiftId,
    ) -> Result<ExchangeDetails> {
        let caller = require_identity(&self.identity)?;
        let exchange = self.backend.exchange(&caller, exchange_shift_id).await?;
        let mut requests = self
            .backend
            .requests_for_exchange(&caller, exchange_shift_id)
            .await?;

        if !exchange.is_posted_by(caller.user_id) && !caller.role.can_manage() {
            requests.retain(|request| request.requester_id() == caller.user_id);
        }
        Ok(ExchangeDetails { exchange, requests })
    }

    /// Lists the caller's own requests.
    #[tracing::instrument(skip(self))]
    pub async fn my_requests(&self) -> Result<Vec<ShiftRequest>> {
        let caller = require_identity(&self.identity)?;
        Ok(self
            .backend
            .requests_by_requester(&caller, caller.user_id)
            .await?)
    }

    async fn poster_exchange(
        &self,
        caller: &Identity,
        exchange_shift_id: ExchangeShiftId,
    ) -> Result<ExchangeShift> {
        let exchange = self.backend.exchange(caller, exchange_shift_id).await?;
        if !exchange.is_posted_by(caller.user_id) {
            return Err(MarketplaceError::Forbidden(format!(
                "only the poster may change exchange {exchange_shift_id}"
            )));
        }
        Ok(exchange)
    }

    /// Declines the pending siblings and hands the exchange to the manager.
    ///
    /// Must run while the exchange is in `PENDING_SELECTION`: the backend
    /// refuses new requests then, so the sibling list read here is complete.
    /// Returns the updated exchange and the number of declined siblings.
    async fn finish_selection(
        &self,
        caller: &Identity,
        exchange: &ExchangeShift,
        accepted_id: ShiftRequestId,
        log: &mut StepLog,
    ) -> Result<(ExchangeShift, usize)> {
        let now = Utc::now();

        let requests = self
            .backend
            .requests_for_exchange(caller, exchange.id())
            .await
            .map_err(|err| log.fail(STEP_LOAD_SIBLINGS, err.into()))?;
        let siblings = pending_siblings(&requests, accepted_id);
        let declined = siblings.len();

        for sibling in siblings {
            let step = decline_step(sibling.id());
            let events = sibling
                .decline_by_poster(now)
                .map_err(|err| log.fail(step.as_str(), err.into()))?;
            self.backend
                .append_request_events(caller, sibling.id(), RequestStatus::Pending, events)
                .await
                .map_err(|err| log.fail(step.as_str(), err.into()))?;
            log.complete(step);
        }

        let events = exchange
            .request_approval(accepted_id, now)
            .map_err(|err| log.fail(STEP_REQUEST_APPROVAL, err.into()))?;
        let exchange = self
            .backend
            .append_exchange_events(
                caller,
                exchange.id(),
                ExchangeStatus::PendingSelection,
                events,
            )
            .await
            .map_err(|err| log.fail(STEP_REQUEST_APPROVAL, err.into()))?;
        log.complete(STEP_REQUEST_APPROVAL);
        Ok((exchange, declined))
    }
}

fn pending_siblings(requests: &[ShiftRequest], accepted_id: ShiftRequestId) -> Vec<ShiftRequest> {
    requests
        .iter()
        .filter(|request| request.id() != accepted_id && request.is_pending())
        .cloned()
        .collect()
}
