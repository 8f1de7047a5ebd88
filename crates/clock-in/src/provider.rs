//! Geolocation provider trait and in-memory implementation.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::Location;
use futures_core::Stream;
use futures_util::{StreamExt, stream};
use tokio::sync::RwLock;

/// Outcome of asking the user for location permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResult {
    Granted,
    Denied,
    /// The platform wants the app to explain why it needs location first.
    ShowRationale,
}

/// Outcome of a single position request.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationResult {
    Success(Location),
    Error(String),
    PermissionDenied,
    /// Location services are switched off on the device.
    Disabled,
}

/// Stream of position updates. Each call to `track_updates` starts a new one.
pub type LocationStream = Pin<Box<dyn Stream<Item = LocationResult> + Send>>;

/// Device location capabilities.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Returns true if location permission is currently granted.
    async fn has_permission(&self) -> bool;

    /// Prompts the user for location permission.
    async fn request_permission(&self) -> PermissionResult;

    /// Waits for a single position fix. May block until the platform answers.
    async fn current_location(&self) -> LocationResult;

    /// Returns a lazy stream of position updates.
    fn track_updates(&self) -> LocationStream;
}

#[derive(Debug, Clone)]
struct InMemoryGeolocationState {
    permission_granted: bool,
    permission_response: PermissionResult,
    location: LocationResult,
    fix_delay: Option<Duration>,
    updates: Vec<LocationResult>,
    permission_requests: u32,
}

impl Default for InMemoryGeolocationState {
    fn default() -> Self {
        Self {
            permission_granted: true,
            permission_response: PermissionResult::Granted,
            location: LocationResult::Error("no fix configured".to_string()),
            fix_delay: None,
            updates: Vec::new(),
            permission_requests: 0,
        }
    }
}

/// Scripted geolocation provider for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeolocationProvider {
    state: Arc<RwLock<InMemoryGeolocationState>>,
}

impl InMemoryGeolocationProvider {
    /// Creates a provider with permission granted and no fix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider with permission granted that reports `location`.
    pub async fn at(location: Location) -> Self {
        let provider = Self::new();
        provider.set_location(LocationResult::Success(location)).await;
        provider
    }

    /// Sets whether permission is currently granted.
    pub async fn set_permission_granted(&self, granted: bool) {
        self.state.write().await.permission_granted = granted;
    }

    /// Sets the answer the user gives to a permission prompt.
    pub async fn set_permission_response(&self, response: PermissionResult) {
        self.state.write().await.permission_response = response;
    }

    /// Sets the result of the next position requests.
    pub async fn set_location(&self, location: LocationResult) {
        self.state.write().await.location = location;
    }

    /// Delays every position fix by `delay`.
    pub async fn set_fix_delay(&self, delay: Duration) {
        self.state.write().await.fix_delay = Some(delay);
    }

    /// Sets the updates emitted by `track_updates`.
    pub async fn set_updates(&self, updates: Vec<LocationResult>) {
        self.state.write().await.updates = updates;
    }

    /// Returns how many times permission was requested.
    pub async fn permission_requests(&self) -> u32 {
        self.state.read().await.permission_requests
    }
}

#[async_trait]
impl GeolocationProvider for InMemoryGeolocationProvider {
    async fn has_permission(&self) -> bool {
        self.state.read().await.permission_granted
    }

    async fn request_permission(&self) -> PermissionResult {
        let mut state = self.state.write().await;
        state.permission_requests += 1;
        if state.permission_response == PermissionResult::Granted {
            state.permission_granted = true;
        }
        state.permission_response
    }

    async fn current_location(&self) -> LocationResult {
        let (delay, location) = {
            let state = self.state.read().await;
            (state.fix_delay, state.location.clone())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        location
    }

    fn track_updates(&self) -> LocationStream {
        let state = self.state.clone();
        stream::once(async move { state.read().await.updates.clone() })
            .flat_map(stream::iter)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_permission_grants_when_user_accepts() {
        let provider = InMemoryGeolocationProvider::new();
        provider.set_permission_granted(false).await;

        assert_eq!(
            provider.request_permission().await,
            PermissionResult::Granted
        );
        assert!(provider.has_permission().await);
        assert_eq!(provider.permission_requests().await, 1);
    }

    #[tokio::test]
    async fn test_denied_prompt_keeps_permission_off() {
        let provider = InMemoryGeolocationProvider::new();
        provider.set_permission_granted(false).await;
        provider
            .set_permission_response(PermissionResult::Denied)
            .await;

        assert_eq!(provider.request_permission().await, PermissionResult::Denied);
        assert!(!provider.has_permission().await);
    }

    #[tokio::test]
    async fn test_track_updates_is_restartable() {
        let provider = InMemoryGeolocationProvider::new();
        provider
            .set_updates(vec![
                LocationResult::Success(Location::new(1.0, 2.0)),
                LocationResult::Disabled,
            ])
            .await;

        let first: Vec<_> = provider.track_updates().collect().await;
        let second: Vec<_> = provider.track_updates().collect().await;

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_track_updates_reads_script_lazily() {
        let provider = InMemoryGeolocationProvider::new();
        let updates = provider.track_updates();

        provider.set_updates(vec![LocationResult::Disabled]).await;

        let collected: Vec<_> = updates.collect().await;
        assert_eq!(collected, vec![LocationResult::Disabled]);
    }
}
