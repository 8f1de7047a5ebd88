//! HTTP API for geofenced clock-in checks and the shift exchange marketplace.
//!
//! Caller identity arrives in request headers, structured logs go through
//! `tracing`, and counters are exported in Prometheus format.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use marketplace::{InMemorySchedulingBackend, SchedulingBackend};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state.
pub struct AppState<B: SchedulingBackend + Clone> {
    pub backend: B,
    pub config: Config,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<B: SchedulingBackend + Clone + 'static>(
    state: Arc<AppState<B>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .route(
            "/clock-in/eligibility",
            post(routes::clock_in::eligibility::<B>),
        )
        .route("/exchanges", get(routes::exchanges::list::<B>))
        .route("/exchanges", post(routes::exchanges::post::<B>))
        .route("/exchanges/{id}", get(routes::exchanges::get::<B>))
        .route(
            "/exchanges/{id}/requests",
            post(routes::exchanges::submit_request::<B>),
        )
        .route(
            "/exchanges/{id}/requests/{request_id}/accept",
            post(routes::exchanges::accept::<B>),
        )
        .route("/exchanges/{id}/resume", post(routes::exchanges::resume::<B>))
        .route("/exchanges/{id}/cancel", post(routes::exchanges::cancel::<B>))
        .route("/requests/mine", get(routes::exchanges::my_requests::<B>))
        .route("/approvals", get(routes::approvals::pending::<B>))
        .route(
            "/approvals/{request_id}/recheck",
            post(routes::approvals::recheck::<B>),
        )
        .route(
            "/approvals/{request_id}/approve",
            post(routes::approvals::approve::<B>),
        )
        .route(
            "/approvals/{request_id}/reject",
            post(routes::approvals::reject::<B>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state backed by the in-memory scheduling backend.
pub fn create_default_state(config: Config) -> Arc<AppState<InMemorySchedulingBackend>> {
    Arc::new(AppState {
        backend: InMemorySchedulingBackend::new(),
        config,
    })
}
