//! Geofenced clock-in eligibility.
//!
//! Eligibility is a pure function of the device fix, the permission state and the
//! work site. Permission prompts and position fixes happen before this is called.

use chrono::{DateTime, Utc};
use common::BusinessUnitId;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the Haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Radius applied when a business unit does not configure one, in meters.
pub const DEFAULT_ALLOWED_RADIUS_METERS: f64 = 200.0;

/// A single device position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the provider reports one.
    pub accuracy: Option<f32>,
    pub captured_at: DateTime<Utc>,
}

impl Location {
    /// Creates a fix captured now, without accuracy information.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            captured_at: Utc::now(),
        }
    }

    /// Sets the reported accuracy.
    pub fn with_accuracy(mut self, accuracy: f32) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

fn default_allowed_radius() -> f64 {
    DEFAULT_ALLOWED_RADIUS_METERS
}

/// Work site address as configured by the organization service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessUnitAddress {
    pub id: BusinessUnitId,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_allowed_radius")]
    pub allowed_radius_meters: f64,
}

impl BusinessUnitAddress {
    /// Creates an address with coordinates and the default radius.
    pub fn new(
        id: BusinessUnitId,
        name: impl Into<String>,
        address: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address: address.into(),
            latitude: Some(latitude),
            longitude: Some(longitude),
            allowed_radius_meters: DEFAULT_ALLOWED_RADIUS_METERS,
        }
    }

    /// Overrides the allowed radius.
    pub fn with_radius(mut self, meters: f64) -> Self {
        self.allowed_radius_meters = meters;
        self
    }

    /// Returns the site coordinates if both are configured.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// Reason code attached to every eligibility verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityReason {
    PermissionDenied,
    LocationUnavailable,
    TargetLocationUnset,
    WithinRange,
    TooFar,
}

impl EligibilityReason {
    /// Returns the reason code as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityReason::PermissionDenied => "PERMISSION_DENIED",
            EligibilityReason::LocationUnavailable => "LOCATION_UNAVAILABLE",
            EligibilityReason::TargetLocationUnset => "TARGET_LOCATION_UNSET",
            EligibilityReason::WithinRange => "WITHIN_RANGE",
            EligibilityReason::TooFar => "TOO_FAR",
        }
    }
}

impl std::fmt::Display for EligibilityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clock-in verdict. Only the in-range and too-far cases carry a distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClockInEligibility {
    PermissionDenied,
    LocationUnavailable,
    TargetLocationUnset,
    WithinRange {
        distance_meters: f64,
    },
    TooFar {
        distance_meters: f64,
        allowed_radius_meters: f64,
    },
}

impl ClockInEligibility {
    /// Returns true if the employee may clock in.
    pub fn is_eligible(&self) -> bool {
        matches!(self, ClockInEligibility::WithinRange { .. })
    }

    /// Returns the computed distance, absent when inputs were unavailable.
    pub fn distance_meters(&self) -> Option<f64> {
        match self {
            ClockInEligibility::WithinRange { distance_meters }
            | ClockInEligibility::TooFar {
                distance_meters, ..
            } => Some(*distance_meters),
            _ => None,
        }
    }

    /// Returns the reason code for this verdict.
    pub fn reason(&self) -> EligibilityReason {
        match self {
            ClockInEligibility::PermissionDenied => EligibilityReason::PermissionDenied,
            ClockInEligibility::LocationUnavailable => EligibilityReason::LocationUnavailable,
            ClockInEligibility::TargetLocationUnset => EligibilityReason::TargetLocationUnset,
            ClockInEligibility::WithinRange { .. } => EligibilityReason::WithinRange,
            ClockInEligibility::TooFar { .. } => EligibilityReason::TooFar,
        }
    }

    /// Returns guidance the user can act on.
    pub fn user_message(&self) -> String {
        match self {
            ClockInEligibility::PermissionDenied => {
                "Location permission is required to clock in. Enable it in settings.".to_string()
            }
            ClockInEligibility::LocationUnavailable => {
                "Your location could not be determined. Turn on location services and try again."
                    .to_string()
            }
            ClockInEligibility::TargetLocationUnset => {
                "This work site has no location configured. Contact your manager.".to_string()
            }
            ClockInEligibility::WithinRange { .. } => "You are at the work site.".to_string(),
            ClockInEligibility::TooFar {
                distance_meters,
                allowed_radius_meters,
            } => format!(
                "You are {:.0} m away. Move within {:.0} m of the work site to clock in.",
                distance_meters, allowed_radius_meters
            ),
        }
    }
}

/// Great-circle distance between two points in meters (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Decides whether the device at `current` may clock in at `target`.
pub fn evaluate(
    current: Option<&Location>,
    permission_granted: bool,
    target: &BusinessUnitAddress,
) -> ClockInEligibility {
    if !permission_granted {
        return ClockInEligibility::PermissionDenied;
    }

    let Some(current) = current else {
        return ClockInEligibility::LocationUnavailable;
    };

    let Some((target_lat, target_lon)) = target.coordinates() else {
        return ClockInEligibility::TargetLocationUnset;
    };

    let distance_meters =
        haversine_distance(current.latitude, current.longitude, target_lat, target_lon);

    if distance_meters <= target.allowed_radius_meters {
        ClockInEligibility::WithinRange { distance_meters }
    } else {
        ClockInEligibility::TooFar {
            distance_meters,
            allowed_radius_meters: target.allowed_radius_meters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boston_site() -> BusinessUnitAddress {
        BusinessUnitAddress::new(
            BusinessUnitId::new(),
            "Downtown",
            "1 City Hall Sq, Boston, MA",
            42.3601,
            -71.0589,
        )
    }

    #[test]
    fn same_point_is_within_range_at_zero_distance() {
        let site = boston_site();
        let here = Location::new(42.3601, -71.0589);

        let verdict = evaluate(Some(&here), true, &site);

        assert!(verdict.is_eligible());
        assert_eq!(verdict.reason(), EligibilityReason::WithinRange);
        assert_eq!(verdict.distance_meters(), Some(0.0));
    }

    #[test]
    fn one_kilometer_north_is_too_far() {
        let site = boston_site();
        let north = Location::new(42.3700, -71.0589);

        let verdict = evaluate(Some(&north), true, &site);

        assert!(!verdict.is_eligible());
        assert_eq!(verdict.reason(), EligibilityReason::TooFar);
        let distance = verdict.distance_meters().unwrap();
        assert!(distance > 200.0);
        assert!((distance - 1_100.8).abs() < 5.0, "distance was {distance}");
    }

    #[test]
    fn permission_denied_wins_over_everything() {
        let site = boston_site();
        let here = Location::new(42.3601, -71.0589);

        for current in [Some(&here), None] {
            let verdict = evaluate(current, false, &site);
            assert_eq!(verdict, ClockInEligibility::PermissionDenied);
            assert_eq!(verdict.distance_meters(), None);
        }

        let mut unset = site.clone();
        unset.latitude = None;
        assert_eq!(
            evaluate(Some(&here), false, &unset),
            ClockInEligibility::PermissionDenied
        );
    }

    #[test]
    fn missing_fix_is_location_unavailable() {
        let verdict = evaluate(None, true, &boston_site());
        assert_eq!(verdict, ClockInEligibility::LocationUnavailable);
        assert!(!verdict.is_eligible());
    }

    #[test]
    fn missing_site_coordinates_is_target_unset() {
        let mut site = boston_site();
        site.longitude = None;
        let here = Location::new(42.3601, -71.0589);

        assert_eq!(
            evaluate(Some(&here), true, &site),
            ClockInEligibility::TargetLocationUnset
        );
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            ((42.3601, -71.0589), (42.3700, -71.0589)),
            ((51.5074, -0.1278), (48.8566, 2.3522)),
            ((-33.8688, 151.2093), (35.6762, 139.6503)),
            ((0.0, 179.9), (0.0, -179.9)),
        ];

        for ((lat1, lon1), (lat2, lon2)) in pairs {
            let ab = haversine_distance(lat1, lon1, lat2, lon2);
            let ba = haversine_distance(lat2, lon2, lat1, lon1);
            assert!((ab - ba).abs() < 1e-6, "{ab} != {ba}");
        }
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let here = Location::new(42.3601, -71.0589);
        let there = Location::new(42.3610, -71.0589);
        let distance = haversine_distance(there.latitude, there.longitude, 42.3601, -71.0589);

        let site = BusinessUnitAddress::new(
            BusinessUnitId::new(),
            "Site",
            "",
            here.latitude,
            here.longitude,
        )
        .with_radius(distance);

        assert!(evaluate(Some(&there), true, &site).is_eligible());
    }

    #[test]
    fn radius_defaults_when_missing_from_payload() {
        let json = format!(
            r#"{{"id":"{}","name":"Site","address":"Main St","latitude":1.0,"longitude":2.0}}"#,
            BusinessUnitId::new()
        );
        let site: BusinessUnitAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(site.allowed_radius_meters, DEFAULT_ALLOWED_RADIUS_METERS);
    }

    #[test]
    fn verdict_serializes_with_reason_tag() {
        let verdict = ClockInEligibility::TooFar {
            distance_meters: 350.0,
            allowed_radius_meters: 200.0,
        };
        let json = serde_json::to_value(verdict).unwrap();
        assert_eq!(json["reason"], "TOO_FAR");
        assert_eq!(json["distance_meters"], 350.0);

        let json = serde_json::to_value(ClockInEligibility::PermissionDenied).unwrap();
        assert_eq!(json, serde_json::json!({ "reason": "PERMISSION_DENIED" }));
    }

    #[test]
    fn too_far_message_mentions_distance() {
        let verdict = ClockInEligibility::TooFar {
            distance_meters: 1_100.4,
            allowed_radius_meters: 200.0,
        };
        assert_eq!(
            verdict.user_message(),
            "You are 1100 m away. Move within 200 m of the work site to clock in."
        );
    }
}
