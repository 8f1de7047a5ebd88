//! ExchangeShift aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::ExchangeShift;
pub use events::ExchangeEvent;
pub use state::ExchangeStatus;

use chrono::{DateTime, Utc};
use common::{BusinessUnitId, ShiftId, ShiftWindow};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Command to post one of the caller's shifts to the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostShift {
    /// The scheduled shift being given away.
    pub shift_id: ShiftId,
    pub business_unit_id: BusinessUnitId,
    pub position: String,
    pub window: ShiftWindow,
    pub poster_name: String,
}

impl PostShift {
    /// Creates a new PostShift command.
    pub fn new(
        shift_id: ShiftId,
        business_unit_id: BusinessUnitId,
        position: impl Into<String>,
        window: ShiftWindow,
        poster_name: impl Into<String>,
    ) -> Self {
        Self {
            shift_id,
            business_unit_id,
            position: position.into(),
            window,
            poster_name: poster_name.into(),
        }
    }

    /// Checks the parts of the command that do not need the backend.
    ///
    /// Ownership of the shift is verified by the scheduling service.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.window.is_well_formed() {
            return Err(DomainError::validation("shift window must end after it starts"));
        }
        if self.window.has_started(now) {
            return Err(DomainError::validation(
                "shift has already started and cannot be posted",
            ));
        }
        if self.position.trim().is_empty() {
            return Err(DomainError::validation("position is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn command(start_offset: Duration) -> PostShift {
        PostShift::new(
            ShiftId::new(),
            BusinessUnitId::new(),
            "Barista",
            ShiftWindow::starting_at(Utc::now() + start_offset, Duration::hours(8)),
            "Ana",
        )
    }

    #[test]
    fn future_shift_is_valid() {
        assert!(command(Duration::hours(2)).validate(Utc::now()).is_ok());
    }

    #[test]
    fn started_shift_is_rejected() {
        let result = command(Duration::hours(-1)).validate(Utc::now());
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut cmd = command(Duration::hours(2));
        cmd.window = ShiftWindow::new(cmd.window.end, cmd.window.start);
        assert!(matches!(
            cmd.validate(Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn blank_position_is_rejected() {
        let mut cmd = command(Duration::hours(2));
        cmd.position = "  ".to_string();
        assert!(matches!(
            cmd.validate(Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }
}
