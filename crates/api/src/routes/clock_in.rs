//! Clock-in eligibility endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use clock_in::{
    ClockInService, GeolocationProvider, LocationResult, LocationStream, PermissionResult,
};
use domain::{BusinessUnitAddress, ClockInEligibility, Location};
use futures_util::{StreamExt, stream};
use marketplace::SchedulingBackend;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Caller;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    /// Fix reported by the device; absent when it could not get one.
    pub location: Option<ReportedLocation>,
    pub permission_granted: bool,
    pub target: BusinessUnitAddress,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f32>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl From<ReportedLocation> for Location {
    fn from(reported: ReportedLocation) -> Self {
        Location {
            latitude: reported.latitude,
            longitude: reported.longitude,
            accuracy: reported.accuracy,
            captured_at: reported.captured_at.unwrap_or_else(Utc::now),
        }
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
    pub reason: &'static str,
    pub distance_meters: Option<f64>,
    pub allowed_radius_meters: f64,
    pub message: String,
}

impl EligibilityResponse {
    fn new(verdict: &ClockInEligibility, target: &BusinessUnitAddress) -> Self {
        Self {
            eligible: verdict.is_eligible(),
            reason: verdict.reason().as_str(),
            distance_meters: verdict.distance_meters(),
            allowed_radius_meters: target.allowed_radius_meters,
            message: verdict.user_message(),
        }
    }
}

/// Geolocation provider answering with what a remote device reported.
///
/// The server cannot prompt the user, so permission requests are denied.
struct ReportedFix {
    permission_granted: bool,
    location: Option<Location>,
}

#[async_trait]
impl GeolocationProvider for ReportedFix {
    async fn has_permission(&self) -> bool {
        self.permission_granted
    }

    async fn request_permission(&self) -> PermissionResult {
        PermissionResult::Denied
    }

    async fn current_location(&self) -> LocationResult {
        match self.location {
            Some(location) => LocationResult::Success(location),
            None => LocationResult::Error("device reported no fix".to_string()),
        }
    }

    fn track_updates(&self) -> LocationStream {
        let location = self.location;
        stream::iter(location.map(LocationResult::Success)).boxed()
    }
}

// -- Handlers --

/// POST /clock-in/eligibility
#[tracing::instrument(skip(state, caller, req), fields(business_unit = %req.target.id))]
pub async fn eligibility<B: SchedulingBackend + Clone + 'static>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    Json(req): Json<EligibilityRequest>,
) -> Result<Json<EligibilityResponse>, ApiError> {
    caller.require()?;

    let provider = ReportedFix {
        permission_granted: req.permission_granted,
        location: req.location.map(Location::from),
    };
    let service = ClockInService::with_config(provider, state.config.clock_in());
    let verdict = service.check(&req.target).await;

    Ok(Json(EligibilityResponse::new(&verdict, &req.target)))
}
