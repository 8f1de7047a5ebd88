//! Clock-in eligibility checks driven by a geolocation provider.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use domain::{BusinessUnitAddress, ClockInEligibility, evaluate};
use futures_core::Stream;
use futures_util::StreamExt;

use crate::provider::{GeolocationProvider, LocationResult, PermissionResult};

/// Stream of verdicts derived from live position updates.
pub type EligibilityStream = Pin<Box<dyn Stream<Item = ClockInEligibility> + Send>>;

/// Clock-in check settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockInConfig {
    /// Longest time to wait for a position fix.
    pub location_timeout: Duration,

    /// Prompt for permission when it is not granted yet.
    pub request_permission_if_missing: bool,
}

impl Default for ClockInConfig {
    fn default() -> Self {
        Self {
            location_timeout: Duration::from_secs(10),
            request_permission_if_missing: true,
        }
    }
}

/// Decides whether the device may clock in at a work site.
pub struct ClockInService<G: GeolocationProvider> {
    provider: G,
    config: ClockInConfig,
}

impl<G: GeolocationProvider> ClockInService<G> {
    /// Creates a service with the default configuration.
    pub fn new(provider: G) -> Self {
        Self::with_config(provider, ClockInConfig::default())
    }

    pub fn with_config(provider: G, config: ClockInConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &G {
        &self.provider
    }

    pub fn config(&self) -> &ClockInConfig {
        &self.config
    }

    /// Checks eligibility, waiting at most `location_timeout` for a fix.
    #[tracing::instrument(skip(self, target), fields(business_unit = %target.id))]
    pub async fn check(&self, target: &BusinessUnitAddress) -> ClockInEligibility {
        self.check_until(target, std::future::pending()).await
    }

    /// Like [`check`](Self::check), but gives up as soon as `abandon` completes.
    ///
    /// An abandoned wait yields `LOCATION_UNAVAILABLE`.
    pub async fn check_until<F>(&self, target: &BusinessUnitAddress, abandon: F) -> ClockInEligibility
    where
        F: Future<Output = ()> + Send,
    {
        let verdict = if self.ensure_permission().await {
            let fix = tokio::select! {
                result = tokio::time::timeout(
                    self.config.location_timeout,
                    self.provider.current_location(),
                ) => match result {
                    Ok(location) => location,
                    Err(_) => {
                        tracing::warn!(
                            timeout_ms = self.config.location_timeout.as_millis() as u64,
                            "timed out waiting for a location fix"
                        );
                        LocationResult::Error("timed out".to_string())
                    }
                },
                () = abandon => {
                    tracing::debug!("location wait abandoned");
                    LocationResult::Error("abandoned".to_string())
                }
            };
            verdict_for(fix, target)
        } else {
            evaluate(None, false, target)
        };

        metrics::counter!("clock_in_checks_total", "reason" => verdict.reason().as_str())
            .increment(1);
        tracing::info!(
            reason = %verdict.reason(),
            distance_meters = verdict.distance_meters(),
            "clock-in eligibility evaluated"
        );

        verdict
    }

    /// Re-evaluates eligibility on every position update from the provider.
    pub fn watch(&self, target: BusinessUnitAddress) -> EligibilityStream {
        self.provider
            .track_updates()
            .map(move |update| verdict_for(update, &target))
            .boxed()
    }

    async fn ensure_permission(&self) -> bool {
        if self.provider.has_permission().await {
            return true;
        }
        if !self.config.request_permission_if_missing {
            return false;
        }

        match self.provider.request_permission().await {
            PermissionResult::Granted => true,
            PermissionResult::Denied | PermissionResult::ShowRationale => false,
        }
    }
}

fn verdict_for(result: LocationResult, target: &BusinessUnitAddress) -> ClockInEligibility {
    match result {
        LocationResult::Success(location) => evaluate(Some(&location), true, target),
        LocationResult::PermissionDenied => evaluate(None, false, target),
        LocationResult::Disabled => evaluate(None, true, target),
        LocationResult::Error(reason) => {
            tracing::debug!(%reason, "location fix failed");
            evaluate(None, true, target)
        }
    }
}
