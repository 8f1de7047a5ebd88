//! Core aggregate and domain event traits.

use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent status transitions that have been decided.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;
}

/// Trait for the marketplace aggregates.
///
/// Command methods on an aggregate check the status guard and return events;
/// `apply` folds an accepted event into the state and must not fail.
/// The scheduling backend remains the source of truth, so a local aggregate is
/// only a short-lived view of what the backend last returned.
pub trait Aggregate: Clone + Send + Sync + Sized {
    /// Identifier type of the aggregate.
    type Id: Copy + Eq + std::fmt::Display;

    /// The type of events this aggregate consumes.
    type Event: DomainEvent;

    /// Returns the aggregate type name, used in logs and error messages.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    fn id(&self) -> Self::Id;

    /// Applies an event to the aggregate, updating its state.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
