//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use api::AppState;
use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::{BusinessUnitId, ShiftWindow, UserId};
use marketplace::InMemorySchedulingBackend;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup_with_state() -> (axum::Router, Arc<AppState<InMemorySchedulingBackend>>) {
    let state = api::create_default_state(Config::default());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn setup() -> axum::Router {
    setup_with_state().0
}

#[derive(Clone, Copy)]
struct User {
    id: UserId,
    business_unit_id: BusinessUnitId,
    role: &'static str,
}

impl User {
    fn new(business_unit_id: BusinessUnitId, role: &'static str) -> Self {
        Self {
            id: UserId::new(),
            business_unit_id,
            role,
        }
    }
}

fn request(
    method: &str,
    uri: &str,
    user: Option<User>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder
            .header("x-user-id", user.id.to_string())
            .header("x-business-unit-id", user.business_unit_id.to_string())
            .header("x-user-role", user.role)
            .header("x-user-name", format!("{} user", user.role))
            .header("authorization", "Bearer test-token");
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

fn tomorrow() -> ShiftWindow {
    ShiftWindow::starting_at(Utc::now() + Duration::days(1), Duration::hours(8))
}

/// Schedules a shift for `poster` and posts it; returns the exchange id.
async fn post_shift(
    app: &axum::Router,
    state: &AppState<InMemorySchedulingBackend>,
    poster: User,
) -> String {
    let window = tomorrow();
    let shift = state
        .backend
        .schedule_shift(poster.id, poster.business_unit_id, window, "Cashier")
        .await;

    let (status, json) = send(
        app,
        request(
            "POST",
            "/exchanges",
            Some(poster),
            Some(serde_json::json!({
                "shift_id": shift.id.to_string(),
                "position": "Cashier",
                "start": window.start,
                "end": window.end,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["status"], "OPEN");
    json["id"].as_str().unwrap().to_string()
}

async fn take(app: &axum::Router, exchange_id: &str, requester: User) -> String {
    let (status, json) = send(
        app,
        request(
            "POST",
            &format!("/exchanges/{exchange_id}/requests"),
            Some(requester),
            Some(serde_json::json!({ "request_type": "TAKE_SHIFT" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["status"], "PENDING");
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_clock_in_within_range() {
    let app = setup();
    let bu = BusinessUnitId::new();
    let employee = User::new(bu, "employee");

    let (status, json) = send(
        &app,
        request(
            "POST",
            "/clock-in/eligibility",
            Some(employee),
            Some(serde_json::json!({
                "permission_granted": true,
                "location": { "latitude": 52.5200, "longitude": 13.4050, "accuracy": 12.0 },
                "target": {
                    "id": bu.to_string(),
                    "name": "Mitte",
                    "address": "Alexanderplatz 1",
                    "latitude": 52.5201,
                    "longitude": 13.4051,
                },
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["eligible"], true);
    assert_eq!(json["reason"], "WITHIN_RANGE");
    assert_eq!(json["allowed_radius_meters"], 200.0);
    assert!(json["distance_meters"].as_f64().unwrap() < 50.0);
}

#[tokio::test]
async fn test_clock_in_too_far() {
    let app = setup();
    let bu = BusinessUnitId::new();
    let employee = User::new(bu, "employee");

    let (status, json) = send(
        &app,
        request(
            "POST",
            "/clock-in/eligibility",
            Some(employee),
            Some(serde_json::json!({
                "permission_granted": true,
                "location": { "latitude": 52.5300, "longitude": 13.4050 },
                "target": {
                    "id": bu.to_string(),
                    "name": "Mitte",
                    "address": "Alexanderplatz 1",
                    "latitude": 52.5200,
                    "longitude": 13.4050,
                    "allowed_radius_meters": 100.0,
                },
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["eligible"], false);
    assert_eq!(json["reason"], "TOO_FAR");
    assert!(json["distance_meters"].as_f64().unwrap() > 1000.0);
    assert!(json["message"].as_str().unwrap().contains("100 m"));
}

#[tokio::test]
async fn test_clock_in_without_permission() {
    let app = setup();
    let bu = BusinessUnitId::new();

    let (status, json) = send(
        &app,
        request(
            "POST",
            "/clock-in/eligibility",
            Some(User::new(bu, "employee")),
            Some(serde_json::json!({
                "permission_granted": false,
                "target": {
                    "id": bu.to_string(),
                    "name": "Mitte",
                    "address": "Alexanderplatz 1",
                    "latitude": 52.5200,
                    "longitude": 13.4050,
                },
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reason"], "PERMISSION_DENIED");
    assert!(json["distance_meters"].is_null());
}

#[tokio::test]
async fn test_clock_in_requires_caller() {
    let app = setup();

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/clock-in/eligibility",
            None,
            Some(serde_json::json!({
                "permission_granted": true,
                "target": {
                    "id": BusinessUnitId::new().to_string(),
                    "name": "Mitte",
                    "address": "Alexanderplatz 1",
                },
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_exchange_flow_to_approval() {
    let (app, state) = setup_with_state();
    let bu = BusinessUnitId::new();
    let poster = User::new(bu, "employee");
    let first = User::new(bu, "employee");
    let second = User::new(bu, "employee");
    let manager = User::new(bu, "manager");

    let exchange_id = post_shift(&app, &state, poster).await;

    let (status, json) = send(&app, request("GET", "/exchanges", Some(first), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let chosen = take(&app, &exchange_id, first).await;
    let other = take(&app, &exchange_id, second).await;

    let (status, json) = send(
        &app,
        request(
            "POST",
            &format!("/exchanges/{exchange_id}/requests/{chosen}/accept"),
            Some(poster),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "ACCEPTED_BY_POSTER");

    let (status, json) = send(
        &app,
        request("GET", &format!("/exchanges/{exchange_id}"), Some(poster), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["exchange"]["status"], "AWAITING_MANAGER_APPROVAL");
    assert_eq!(json["exchange"]["accepted_request_id"], chosen.as_str());
    let declined = json["requests"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == other.as_str())
        .unwrap();
    assert_eq!(declined["status"], "DECLINED_BY_POSTER");

    let (status, json) = send(&app, request("GET", "/approvals", Some(manager), None)).await;
    assert_eq!(status, StatusCode::OK);
    let pending = json.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["request"]["id"], chosen.as_str());
    assert!(pending[0]["request"]["is_execution_possible"].is_null());

    let (status, json) = send(
        &app,
        request("GET", "/approvals?refresh=true", Some(manager), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["request"]["is_execution_possible"], true);

    let (status, json) = send(
        &app,
        request(
            "POST",
            &format!("/approvals/{chosen}/approve"),
            Some(manager),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["exchange"]["status"], "APPROVED");
    assert_eq!(json["request"]["status"], "APPROVED_BY_MANAGER");

    let (status, json) = send(&app, request("GET", "/approvals", Some(manager), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());

    let (status, json) = send(&app, request("GET", "/requests/mine", Some(first), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["status"], "APPROVED_BY_MANAGER");
}

#[tokio::test]
async fn test_manager_rejects_exchange() {
    let (app, state) = setup_with_state();
    let bu = BusinessUnitId::new();
    let poster = User::new(bu, "employee");
    let requester = User::new(bu, "employee");
    let manager = User::new(bu, "admin");

    let exchange_id = post_shift(&app, &state, poster).await;
    let request_id = take(&app, &exchange_id, requester).await;
    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/exchanges/{exchange_id}/requests/{request_id}/accept"),
            Some(poster),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &app,
        request(
            "POST",
            &format!("/approvals/{request_id}/reject"),
            Some(manager),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["exchange"]["status"], "REJECTED");
    assert_eq!(json["request"]["status"], "REJECTED_BY_MANAGER");
}

#[tokio::test]
async fn test_employee_cannot_list_approvals() {
    let app = setup();
    let employee = User::new(BusinessUnitId::new(), "employee");

    let (status, json) = send(&app, request("GET", "/approvals", Some(employee), None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["error"].as_str().unwrap().contains("EMPLOYEE"));
}

#[tokio::test]
async fn test_request_on_cancelled_exchange_conflicts() {
    let (app, state) = setup_with_state();
    let bu = BusinessUnitId::new();
    let poster = User::new(bu, "employee");

    let exchange_id = post_shift(&app, &state, poster).await;
    let (status, json) = send(
        &app,
        request(
            "POST",
            &format!("/exchanges/{exchange_id}/cancel"),
            Some(poster),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "CANCELLED");

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/exchanges/{exchange_id}/requests"),
            Some(User::new(bu, "employee")),
            Some(serde_json::json!({ "request_type": "TAKE_SHIFT" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_swap_without_shift_is_bad_request() {
    let (app, state) = setup_with_state();
    let bu = BusinessUnitId::new();
    let poster = User::new(bu, "employee");
    let exchange_id = post_shift(&app, &state, poster).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/exchanges/{exchange_id}/requests"),
            Some(User::new(bu, "employee")),
            Some(serde_json::json!({ "request_type": "SWAP_SHIFT" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_exchange_id_format() {
    let app = setup();
    let user = User::new(BusinessUnitId::new(), "employee");

    let (status, _) = send(&app, request("GET", "/exchanges/not-a-uuid", Some(user), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_exchange_is_not_found() {
    let app = setup();
    let user = User::new(BusinessUnitId::new(), "employee");
    let missing = common::ExchangeShiftId::new();

    let (status, _) = send(
        &app,
        request("GET", &format!("/exchanges/{missing}"), Some(user), None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_offline_backend_is_service_unavailable() {
    let (app, state) = setup_with_state();
    let user = User::new(BusinessUnitId::new(), "employee");
    state.backend.set_offline(true).await;

    let (status, json) = send(&app, request("GET", "/exchanges", Some(user), None)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}
