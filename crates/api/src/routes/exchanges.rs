//! Shift exchange marketplace endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{ExchangeShiftId, ShiftId, ShiftRequestId, ShiftWindow};
use domain::{
    Aggregate, ExchangeShift, PostShift, RequestKind, RequestType, ShiftRequest, SubmitRequest,
};
use marketplace::{MarketplaceWorkflow, SchedulingBackend, StaticIdentityProvider};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Caller;

// -- Request types --

#[derive(Deserialize)]
pub struct PostShiftRequest {
    pub shift_id: String,
    pub position: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub poster_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SubmitShiftRequest {
    pub request_type: RequestType,
    pub swap_shift_id: Option<String>,
    pub requester_name: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ExchangeResponse {
    pub id: String,
    pub shift_id: String,
    pub poster_id: String,
    pub business_unit_id: String,
    pub status: String,
    pub accepted_request_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub position: String,
    pub poster_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ExchangeShift> for ExchangeResponse {
    fn from(exchange: &ExchangeShift) -> Self {
        Self {
            id: exchange.id().to_string(),
            shift_id: exchange.shift_id().to_string(),
            poster_id: exchange.poster_id().to_string(),
            business_unit_id: exchange.business_unit_id().to_string(),
            status: exchange.status().to_string(),
            accepted_request_id: exchange.accepted_request_id().map(|id| id.to_string()),
            start: exchange.window().start,
            end: exchange.window().end,
            position: exchange.position().to_string(),
            poster_name: exchange.poster_name().to_string(),
            created_at: exchange.created_at(),
            updated_at: exchange.updated_at(),
        }
    }
}

#[derive(Serialize)]
pub struct RequestResponse {
    pub id: String,
    pub exchange_shift_id: String,
    pub requester_id: String,
    pub request_type: String,
    pub swap_shift_id: Option<String>,
    pub swap_start: Option<DateTime<Utc>>,
    pub swap_end: Option<DateTime<Utc>>,
    pub swap_position: Option<String>,
    pub status: String,
    pub requester_name: String,
    pub is_execution_possible: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ShiftRequest> for RequestResponse {
    fn from(request: &ShiftRequest) -> Self {
        let offer = match request.kind() {
            RequestKind::TakeShift => None,
            RequestKind::SwapShift(offer) => Some(offer),
        };
        Self {
            id: request.id().to_string(),
            exchange_shift_id: request.exchange_shift_id().to_string(),
            requester_id: request.requester_id().to_string(),
            request_type: request.request_type().to_string(),
            swap_shift_id: offer.map(|offer| offer.shift_id.to_string()),
            swap_start: offer.and_then(|offer| offer.window).map(|window| window.start),
            swap_end: offer.and_then(|offer| offer.window).map(|window| window.end),
            swap_position: offer.and_then(|offer| offer.position.clone()),
            status: request.status().to_string(),
            requester_name: request.requester_name().to_string(),
            is_execution_possible: request.is_execution_possible(),
            created_at: request.created_at(),
            updated_at: request.updated_at(),
        }
    }
}

#[derive(Serialize)]
pub struct ExchangeDetailsResponse {
    pub exchange: ExchangeResponse,
    pub requests: Vec<RequestResponse>,
}

type Workflow<B> = MarketplaceWorkflow<B, StaticIdentityProvider>;

fn workflow<B: SchedulingBackend + Clone>(state: &AppState<B>, caller: &Caller) -> Workflow<B> {
    MarketplaceWorkflow::new(state.backend.clone(), caller.provider())
}

// -- Handlers --

/// GET /exchanges: open exchanges in the caller's business unit.
#[tracing::instrument(skip(state, caller))]
pub async fn list<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
) -> Result<Json<Vec<ExchangeResponse>>, ApiError> {
    let exchanges = workflow(&state, &caller).list_open_exchanges().await?;
    Ok(Json(exchanges.iter().map(ExchangeResponse::from).collect()))
}

/// POST /exchanges: post one of the caller's shifts.
#[tracing::instrument(skip(state, caller, req))]
pub async fn post<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Json(req): Json<PostShiftRequest>,
) -> Result<(StatusCode, Json<ExchangeResponse>), ApiError> {
    let identity = caller.require()?;
    let shift_id: ShiftId = parse_id(&req.shift_id, "shift_id")?;
    let poster_name = req
        .poster_name
        .unwrap_or_else(|| identity.display_name.clone());
    let cmd = PostShift::new(
        shift_id,
        identity.business_unit_id,
        req.position,
        ShiftWindow::new(req.start, req.end),
        poster_name,
    );

    let exchange = workflow(&state, &caller).post_shift(cmd).await?;
    Ok((StatusCode::CREATED, Json(ExchangeResponse::from(&exchange))))
}

/// GET /exchanges/{id}: an exchange with the requests the caller may see.
#[tracing::instrument(skip(state, caller))]
pub async fn get<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<ExchangeDetailsResponse>, ApiError> {
    let exchange_id: ExchangeShiftId = parse_id(&id, "exchange id")?;
    let details = workflow(&state, &caller)
        .exchange_details(exchange_id)
        .await?;

    Ok(Json(ExchangeDetailsResponse {
        exchange: ExchangeResponse::from(&details.exchange),
        requests: details.requests.iter().map(RequestResponse::from).collect(),
    }))
}

/// POST /exchanges/{id}/requests: request to take or swap the shift.
#[tracing::instrument(skip(state, caller, req))]
pub async fn submit_request<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<SubmitShiftRequest>,
) -> Result<(StatusCode, Json<RequestResponse>), ApiError> {
    let exchange_id: ExchangeShiftId = parse_id(&id, "exchange id")?;
    let swap_shift_id = req
        .swap_shift_id
        .as_deref()
        .map(|raw| parse_id::<ShiftId>(raw, "swap_shift_id"))
        .transpose()?;
    let cmd = SubmitRequest {
        exchange_shift_id: exchange_id,
        request_type: req.request_type,
        swap_shift_id,
        requester_name: req.requester_name.unwrap_or_default(),
    };

    let request = workflow(&state, &caller).submit_request(cmd).await?;
    Ok((StatusCode::CREATED, Json(RequestResponse::from(&request))))
}

/// POST /exchanges/{id}/requests/{request_id}/accept: the poster picks a request.
#[tracing::instrument(skip(state, caller))]
pub async fn accept<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Path((id, request_id)): Path<(String, String)>,
) -> Result<Json<RequestResponse>, ApiError> {
    let exchange_id: ExchangeShiftId = parse_id(&id, "exchange id")?;
    let request_id: ShiftRequestId = parse_id(&request_id, "request id")?;

    let request = workflow(&state, &caller)
        .accept_request(exchange_id, request_id)
        .await?;
    Ok(Json(RequestResponse::from(&request)))
}

/// POST /exchanges/{id}/resume: finish an interrupted acceptance.
#[tracing::instrument(skip(state, caller))]
pub async fn resume<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let exchange_id: ExchangeShiftId = parse_id(&id, "exchange id")?;
    let exchange = workflow(&state, &caller)
        .resume_acceptance(exchange_id)
        .await?;
    Ok(Json(ExchangeResponse::from(&exchange)))
}

/// POST /exchanges/{id}/cancel: withdraw a posted shift.
#[tracing::instrument(skip(state, caller))]
pub async fn cancel<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let exchange_id: ExchangeShiftId = parse_id(&id, "exchange id")?;
    let exchange = workflow(&state, &caller)
        .cancel_exchange_shift(exchange_id)
        .await?;
    Ok(Json(ExchangeResponse::from(&exchange)))
}

/// GET /requests/mine: the caller's own requests.
#[tracing::instrument(skip(state, caller))]
pub async fn my_requests<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
) -> Result<Json<Vec<RequestResponse>>, ApiError> {
    let requests = workflow(&state, &caller).my_requests().await?;
    Ok(Json(requests.iter().map(RequestResponse::from).collect()))
}

pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))
}
