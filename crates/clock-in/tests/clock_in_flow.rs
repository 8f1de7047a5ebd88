//! Integration tests for clock-in checks against a scripted provider.

use std::time::Duration;

use clock_in::{
    ClockInConfig, ClockInService, GeolocationProvider, InMemoryGeolocationProvider,
    LocationResult, PermissionResult,
};
use common::BusinessUnitId;
use domain::{BusinessUnitAddress, ClockInEligibility, EligibilityReason, Location};
use futures_util::StreamExt;

fn downtown() -> BusinessUnitAddress {
    BusinessUnitAddress::new(
        BusinessUnitId::new(),
        "Downtown",
        "1 City Hall Sq, Boston, MA",
        42.3601,
        -71.0589,
    )
}

#[tokio::test]
async fn test_on_site_employee_can_clock_in() {
    let provider = InMemoryGeolocationProvider::at(Location::new(42.3601, -71.0589)).await;
    let service = ClockInService::new(provider);

    let verdict = service.check(&downtown()).await;

    assert!(verdict.is_eligible());
    assert_eq!(verdict.distance_meters(), Some(0.0));
}

#[tokio::test]
async fn test_employee_a_kilometer_away_is_too_far() {
    let provider = InMemoryGeolocationProvider::at(Location::new(42.3700, -71.0589)).await;
    let service = ClockInService::new(provider);

    let verdict = service.check(&downtown()).await;

    assert_eq!(verdict.reason(), EligibilityReason::TooFar);
    assert!(verdict.distance_meters().unwrap() > 200.0);
}

#[tokio::test]
async fn test_missing_permission_is_requested_first() {
    let provider = InMemoryGeolocationProvider::at(Location::new(42.3601, -71.0589)).await;
    provider.set_permission_granted(false).await;
    let service = ClockInService::new(provider.clone());

    let verdict = service.check(&downtown()).await;

    assert!(verdict.is_eligible());
    assert_eq!(provider.permission_requests().await, 1);
    assert!(provider.has_permission().await);
}

#[tokio::test]
async fn test_rationale_prompt_counts_as_denied() {
    let provider = InMemoryGeolocationProvider::at(Location::new(42.3601, -71.0589)).await;
    provider.set_permission_granted(false).await;
    provider
        .set_permission_response(PermissionResult::ShowRationale)
        .await;
    let service = ClockInService::new(provider);

    let verdict = service.check(&downtown()).await;

    assert_eq!(verdict, ClockInEligibility::PermissionDenied);
    assert_eq!(verdict.distance_meters(), None);
}

#[tokio::test]
async fn test_slow_fix_times_out_as_unavailable() {
    let provider = InMemoryGeolocationProvider::at(Location::new(42.3601, -71.0589)).await;
    provider.set_fix_delay(Duration::from_secs(5)).await;
    let config = ClockInConfig {
        location_timeout: Duration::from_millis(50),
        ..ClockInConfig::default()
    };
    let service = ClockInService::with_config(provider, config);

    let verdict = service.check(&downtown()).await;

    assert_eq!(verdict, ClockInEligibility::LocationUnavailable);
}

#[tokio::test]
async fn test_unset_site_location() {
    let provider = InMemoryGeolocationProvider::at(Location::new(42.3601, -71.0589)).await;
    let service = ClockInService::new(provider);
    let mut site = downtown();
    site.latitude = None;

    let verdict = service.check(&site).await;

    assert_eq!(verdict, ClockInEligibility::TargetLocationUnset);
}

#[tokio::test]
async fn test_watch_follows_position_updates() {
    let provider = InMemoryGeolocationProvider::new();
    provider
        .set_updates(vec![
            LocationResult::Success(Location::new(42.3700, -71.0589)),
            LocationResult::Success(Location::new(42.3602, -71.0589).with_accuracy(8.0)),
            LocationResult::Disabled,
            LocationResult::PermissionDenied,
        ])
        .await;
    let service = ClockInService::new(provider);

    let reasons: Vec<EligibilityReason> = service
        .watch(downtown())
        .map(|verdict| verdict.reason())
        .collect()
        .await;

    assert_eq!(
        reasons,
        vec![
            EligibilityReason::TooFar,
            EligibilityReason::WithinRange,
            EligibilityReason::LocationUnavailable,
            EligibilityReason::PermissionDenied,
        ]
    );
}
