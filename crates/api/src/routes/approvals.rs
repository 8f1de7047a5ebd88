//! Manager approval endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::ShiftRequestId;
use marketplace::{
    ExchangeDecision, ManagerApprovalOrchestrator, PendingExchange, SchedulingBackend,
    StaticIdentityProvider,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Caller;
use crate::routes::exchanges::{ExchangeResponse, RequestResponse, parse_id};

#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    /// Recheck every pending exchange before answering.
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Serialize)]
pub struct PendingExchangeResponse {
    pub exchange: ExchangeResponse,
    pub request: RequestResponse,
}

impl From<&PendingExchange> for PendingExchangeResponse {
    fn from(item: &PendingExchange) -> Self {
        Self {
            exchange: ExchangeResponse::from(&item.exchange),
            request: RequestResponse::from(&item.request),
        }
    }
}

impl From<&ExchangeDecision> for PendingExchangeResponse {
    fn from(decision: &ExchangeDecision) -> Self {
        Self {
            exchange: ExchangeResponse::from(&decision.exchange),
            request: RequestResponse::from(&decision.request),
        }
    }
}

type Approvals<B> = ManagerApprovalOrchestrator<B, StaticIdentityProvider>;

/// Each HTTP request is its own approval session.
fn approvals<B: SchedulingBackend + Clone>(
    state: &AppState<B>,
    caller: &Caller,
) -> Result<Approvals<B>, ApiError> {
    caller.require_manager()?;
    Ok(
        ManagerApprovalOrchestrator::new(state.backend.clone(), caller.provider())
            .with_policy(state.config.approval_policy()),
    )
}

/// GET /approvals: exchanges awaiting a manager decision.
#[tracing::instrument(skip(state, caller))]
pub async fn pending<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<PendingExchangeResponse>>, ApiError> {
    let approvals = approvals(&state, &caller)?;
    let pending = if query.refresh {
        approvals.refresh_pending_exchanges().await?
    } else {
        approvals.get_pending_exchanges().await?
    };
    Ok(Json(pending.iter().map(PendingExchangeResponse::from).collect()))
}

/// POST /approvals/{request_id}/recheck
#[tracing::instrument(skip(state, caller))]
pub async fn recheck<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Path(request_id): Path<String>,
) -> Result<Json<RequestResponse>, ApiError> {
    let request_id: ShiftRequestId = parse_id(&request_id, "request id")?;
    let request = approvals(&state, &caller)?.recheck(request_id).await?;
    Ok(Json(RequestResponse::from(&request)))
}

/// POST /approvals/{request_id}/approve
#[tracing::instrument(skip(state, caller))]
pub async fn approve<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Path(request_id): Path<String>,
) -> Result<Json<PendingExchangeResponse>, ApiError> {
    let request_id: ShiftRequestId = parse_id(&request_id, "request id")?;
    let decision = approvals(&state, &caller)?
        .approve_exchange(request_id)
        .await?;
    Ok(Json(PendingExchangeResponse::from(&decision)))
}

/// POST /approvals/{request_id}/reject
#[tracing::instrument(skip(state, caller))]
pub async fn reject<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Path(request_id): Path<String>,
) -> Result<Json<PendingExchangeResponse>, ApiError> {
    let request_id: ShiftRequestId = parse_id(&request_id, "request id")?;
    let decision = approvals(&state, &caller)?
        .reject_exchange(request_id)
        .await?;
    Ok(Json(PendingExchangeResponse::from(&decision)))
}
