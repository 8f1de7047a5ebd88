//! In-memory scheduling backend for testing and local runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    BusinessUnitId, ExchangeShiftId, Identity, ShiftId, ShiftRequestId, ShiftWindow, UserId,
};
use domain::{
    Aggregate, DomainEvent, ExchangeEvent, ExchangeShift, ExchangeStatus, PostShift, RequestEvent,
    RequestKind, RequestStatus, ShiftRequest,
};
use tokio::sync::RwLock;

use super::{BackendError, ScheduledShift, SchedulingBackend};

#[derive(Debug, Default)]
struct InMemoryBackendState {
    shifts: HashMap<ShiftId, ScheduledShift>,
    exchanges: HashMap<ExchangeShiftId, ExchangeShift>,
    requests: HashMap<ShiftRequestId, ShiftRequest>,
    failing_exchange_events: HashSet<&'static str>,
    failing_requests: HashSet<ShiftRequestId>,
    offline: bool,
    calls: usize,
}

impl InMemoryBackendState {
    /// Counts the call and fails it while the backend is offline.
    fn begin_call(&mut self) -> Result<(), BackendError> {
        self.calls += 1;
        if self.offline {
            return Err(BackendError::Transient("backend offline".to_string()));
        }
        Ok(())
    }

    fn exchange(&self, id: ExchangeShiftId) -> Result<&ExchangeShift, BackendError> {
        self.exchanges.get(&id).ok_or_else(|| BackendError::NotFound {
            entity: ExchangeShift::aggregate_type(),
            id: id.to_string(),
        })
    }

    fn request(&self, id: ShiftRequestId) -> Result<&ShiftRequest, BackendError> {
        self.requests.get(&id).ok_or_else(|| BackendError::NotFound {
            entity: ShiftRequest::aggregate_type(),
            id: id.to_string(),
        })
    }

    /// Returns true if `user` works any shift other than `except` during `window`.
    fn is_busy(&self, user: UserId, window: &ShiftWindow, except: &[ShiftId]) -> bool {
        self.shifts.values().any(|shift| {
            shift.owner_id == user && !except.contains(&shift.id) && shift.window.overlaps(window)
        })
    }
}

/// In-memory scheduling backend.
///
/// Enforces the same status preconditions as the remote service and can be
/// told to fail individual calls.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchedulingBackend {
    state: Arc<RwLock<InMemoryBackendState>>,
}

impl InMemorySchedulingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shift to the schedule.
    pub async fn add_shift(&self, shift: ScheduledShift) {
        self.state.write().await.shifts.insert(shift.id, shift);
    }

    /// Schedules a new shift for `owner` and returns it.
    pub async fn schedule_shift(
        &self,
        owner_id: UserId,
        business_unit_id: BusinessUnitId,
        window: ShiftWindow,
        position: impl Into<String>,
    ) -> ScheduledShift {
        let shift = ScheduledShift {
            id: ShiftId::new(),
            owner_id,
            business_unit_id,
            window,
            position: position.into(),
        };
        self.add_shift(shift.clone()).await;
        shift
    }

    /// Makes every subsequent call fail with a transient error.
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }

    /// Fails exchange updates that carry an event of `event_type`.
    pub async fn fail_exchange_event(&self, event_type: &'static str) {
        self.state
            .write()
            .await
            .failing_exchange_events
            .insert(event_type);
    }

    /// Fails every update of the given request.
    pub async fn fail_request_updates(&self, request_id: ShiftRequestId) {
        self.state.write().await.failing_requests.insert(request_id);
    }

    /// Removes all injected failures.
    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.failing_exchange_events.clear();
        state.failing_requests.clear();
        state.offline = false;
    }

    /// Returns the number of backend calls made so far.
    pub async fn call_count(&self) -> usize {
        self.state.read().await.calls
    }

    /// Reads an exchange without counting a call.
    pub async fn stored_exchange(&self, id: ExchangeShiftId) -> Option<ExchangeShift> {
        self.state.read().await.exchanges.get(&id).cloned()
    }

    /// Reads a request without counting a call.
    pub async fn stored_request(&self, id: ShiftRequestId) -> Option<ShiftRequest> {
        self.state.read().await.requests.get(&id).cloned()
    }
}

#[async_trait]
impl SchedulingBackend for InMemorySchedulingBackend {
    async fn shift(
        &self,
        _caller: &Identity,
        shift_id: ShiftId,
    ) -> Result<ScheduledShift, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;

        state
            .shifts
            .get(&shift_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                entity: "Shift",
                id: shift_id.to_string(),
            })
    }

    async fn create_exchange(
        &self,
        caller: &Identity,
        cmd: PostShift,
    ) -> Result<ExchangeShift, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;

        let now = Utc::now();
        let Some(shift) = state.shifts.get(&cmd.shift_id) else {
            return Err(BackendError::Rejected(format!(
                "shift {} does not exist",
                cmd.shift_id
            )));
        };
        if shift.owner_id != caller.user_id {
            return Err(BackendError::Rejected(format!(
                "shift {} is not assigned to the caller",
                cmd.shift_id
            )));
        }
        if shift.window.has_started(now) {
            return Err(BackendError::Rejected(format!(
                "shift {} has already started",
                cmd.shift_id
            )));
        }
        if state
            .exchanges
            .values()
            .any(|exchange| exchange.shift_id() == cmd.shift_id && !exchange.is_terminal())
        {
            return Err(BackendError::Rejected(format!(
                "shift {} is already posted",
                cmd.shift_id
            )));
        }

        let exchange = ExchangeShift::posted(ExchangeShiftId::new(), caller.user_id, cmd, now);
        state.exchanges.insert(exchange.id(), exchange.clone());
        Ok(exchange)
    }

    async fn exchange(
        &self,
        _caller: &Identity,
        id: ExchangeShiftId,
    ) -> Result<ExchangeShift, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;
        state.exchange(id).cloned()
    }

    async fn exchanges(
        &self,
        _caller: &Identity,
        business_unit_id: BusinessUnitId,
        status: Option<ExchangeStatus>,
    ) -> Result<Vec<ExchangeShift>, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;

        let mut exchanges: Vec<ExchangeShift> = state
            .exchanges
            .values()
            .filter(|exchange| exchange.business_unit_id() == business_unit_id)
            .filter(|exchange| status.is_none_or(|status| exchange.status() == status))
            .cloned()
            .collect();
        exchanges.sort_by_key(|exchange| (exchange.created_at(), exchange.id()));
        Ok(exchanges)
    }

    async fn append_exchange_events(
        &self,
        _caller: &Identity,
        id: ExchangeShiftId,
        expected: ExchangeStatus,
        events: Vec<ExchangeEvent>,
    ) -> Result<ExchangeShift, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;

        if let Some(event) = events
            .iter()
            .find(|event| state.failing_exchange_events.contains(event.event_type()))
        {
            return Err(BackendError::Transient(format!(
                "{} could not be stored",
                event.event_type()
            )));
        }

        let actual = state.exchange(id)?.status();
        if actual != expected {
            return Err(BackendError::StatusConflict {
                entity: ExchangeShift::aggregate_type(),
                id: id.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        let exchange = state
            .exchanges
            .get_mut(&id)
            .ok_or_else(|| BackendError::Permanent(format!("exchange {id} vanished")))?;
        exchange.apply_events(events);
        Ok(exchange.clone())
    }

    async fn create_request(
        &self,
        caller: &Identity,
        exchange_shift_id: ExchangeShiftId,
        kind: RequestKind,
        requester_name: String,
    ) -> Result<ShiftRequest, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;

        let exchange = state.exchange(exchange_shift_id)?;
        if !exchange.status().can_receive_requests() {
            return Err(BackendError::StatusConflict {
                entity: ExchangeShift::aggregate_type(),
                id: exchange_shift_id.to_string(),
                expected: ExchangeStatus::Open.to_string(),
                actual: exchange.status().to_string(),
            });
        }
        if exchange.is_posted_by(caller.user_id) {
            return Err(BackendError::Rejected(
                "posters cannot request their own shift".to_string(),
            ));
        }
        if let Some(swap_shift_id) = kind.swap_shift_id() {
            let owned = state
                .shifts
                .get(&swap_shift_id)
                .is_some_and(|shift| shift.owner_id == caller.user_id);
            if !owned {
                return Err(BackendError::Rejected(format!(
                    "shift {swap_shift_id} is not assigned to the caller"
                )));
            }
        }

        let request = ShiftRequest::submitted(
            ShiftRequestId::new(),
            exchange_shift_id,
            caller.user_id,
            kind,
            requester_name,
            Utc::now(),
        );
        state.requests.insert(request.id(), request.clone());
        Ok(request)
    }

    async fn request(
        &self,
        _caller: &Identity,
        id: ShiftRequestId,
    ) -> Result<ShiftRequest, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;
        state.request(id).cloned()
    }

    async fn requests_for_exchange(
        &self,
        _caller: &Identity,
        exchange_shift_id: ExchangeShiftId,
    ) -> Result<Vec<ShiftRequest>, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;
        state.exchange(exchange_shift_id)?;

        let mut requests: Vec<ShiftRequest> = state
            .requests
            .values()
            .filter(|request| request.exchange_shift_id() == exchange_shift_id)
            .cloned()
            .collect();
        requests.sort_by_key(|request| (request.created_at(), request.id()));
        Ok(requests)
    }

    async fn requests_by_requester(
        &self,
        _caller: &Identity,
        requester_id: UserId,
    ) -> Result<Vec<ShiftRequest>, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;

        let mut requests: Vec<ShiftRequest> = state
            .requests
            .values()
            .filter(|request| request.requester_id() == requester_id)
            .cloned()
            .collect();
        requests.sort_by_key(|request| (request.created_at(), request.id()));
        Ok(requests)
    }

    async fn append_request_events(
        &self,
        _caller: &Identity,
        id: ShiftRequestId,
        expected: RequestStatus,
        events: Vec<RequestEvent>,
    ) -> Result<ShiftRequest, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;

        if state.failing_requests.contains(&id) {
            return Err(BackendError::Transient(format!(
                "request {id} could not be updated"
            )));
        }

        let actual = state.request(id)?.status();
        if actual != expected {
            return Err(BackendError::StatusConflict {
                entity: ShiftRequest::aggregate_type(),
                id: id.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        let request = state
            .requests
            .get_mut(&id)
            .ok_or_else(|| BackendError::Permanent(format!("request {id} vanished")))?;
        request.apply_events(events);
        Ok(request.clone())
    }

    async fn validate_execution(
        &self,
        _caller: &Identity,
        request: &ShiftRequest,
        exchange: &ExchangeShift,
    ) -> Result<bool, BackendError> {
        let mut state = self.state.write().await;
        state.begin_call()?;

        let posted_still_owned = state
            .shifts
            .get(&exchange.shift_id())
            .is_some_and(|shift| shift.owner_id == exchange.poster_id());
        if !posted_still_owned {
            return Ok(false);
        }

        let window = exchange.window();
        match request.kind() {
            RequestKind::TakeShift => Ok(!state.is_busy(request.requester_id(), &window, &[])),
            RequestKind::SwapShift(offer) => {
                let Some(swap_shift) = state.shifts.get(&offer.shift_id) else {
                    return Ok(false);
                };
                if swap_shift.owner_id != request.requester_id() {
                    return Ok(false);
                }
                let swap_window = swap_shift.window;
                let requester_free =
                    !state.is_busy(request.requester_id(), &window, &[offer.shift_id]);
                let poster_free =
                    !state.is_busy(exchange.poster_id(), &swap_window, &[exchange.shift_id()]);
                Ok(requester_free && poster_free)
            }
        }
    }
}
