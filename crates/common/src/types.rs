use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Each identifier gets its own type so that a shift id can never be passed
/// where a request id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of an employee account.
    UserId
);

uuid_id!(
    /// Identifier of a business unit (work site).
    BusinessUnitId
);

uuid_id!(
    /// Identifier of a scheduled shift owned by the scheduling service.
    ShiftId
);

uuid_id!(
    /// Identifier of a shift posted to the marketplace.
    ExchangeShiftId
);

uuid_id!(
    /// Identifier of a take or swap request against a posted shift.
    ShiftRequestId
);

/// The time span a shift covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ShiftWindow {
    /// Creates a window from its bounds. Ordering is not checked here.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Creates a window starting at `start` and lasting `length`.
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start,
            end: start + length,
        }
    }

    /// Returns true if the end lies strictly after the start.
    pub fn is_well_formed(&self) -> bool {
        self.end > self.start
    }

    /// Returns true if the shift has started at `now`.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start <= now
    }

    /// Returns true if the two windows share any instant.
    pub fn overlaps(&self, other: &ShiftWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(UserId::new(), UserId::new());
        assert_ne!(ExchangeShiftId::new(), ExchangeShiftId::new());
    }

    #[test]
    fn id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = ShiftRequestId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn id_parses_from_display() {
        let id = ShiftId::new();
        let parsed: ShiftId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<ShiftId>().is_err());
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = BusinessUnitId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }

    #[test]
    fn window_overlap() {
        let start = Utc::now();
        let a = ShiftWindow::starting_at(start, Duration::hours(8));
        let b = ShiftWindow::starting_at(start + Duration::hours(7), Duration::hours(8));
        let c = ShiftWindow::starting_at(start + Duration::hours(8), Duration::hours(8));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn window_started_and_well_formed() {
        let now = Utc::now();
        let past = ShiftWindow::starting_at(now - Duration::hours(1), Duration::hours(4));
        let future = ShiftWindow::starting_at(now + Duration::hours(1), Duration::hours(4));

        assert!(past.has_started(now));
        assert!(!future.has_started(now));
        assert!(future.is_well_formed());
        assert!(!ShiftWindow::new(now, now).is_well_formed());
        assert_eq!(future.end - future.start, Duration::hours(4));
    }
}
