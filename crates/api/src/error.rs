//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use marketplace::{MarketplaceError, RemoteErrorKind};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path, header or body.
    BadRequest(String),
    /// The caller lacks the capability for this route.
    Forbidden(String),
    /// Error returned by the marketplace core.
    Marketplace(MarketplaceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, error_body(msg)),
            ApiError::Marketplace(err) => marketplace_error_to_response(err),
        };

        metrics::counter!("api_errors_total", "status" => status.as_str().to_string())
            .increment(1);
        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: String) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

fn marketplace_error_to_response(err: MarketplaceError) -> (StatusCode, serde_json::Value) {
    match &err {
        MarketplaceError::Validation(_) => (StatusCode::BAD_REQUEST, error_body(err.to_string())),
        MarketplaceError::InvalidState(_) => (StatusCode::CONFLICT, error_body(err.to_string())),
        MarketplaceError::Unauthenticated(_) => {
            (StatusCode::UNAUTHORIZED, error_body(err.to_string()))
        }
        MarketplaceError::Forbidden(_) => (StatusCode::FORBIDDEN, error_body(err.to_string())),
        MarketplaceError::Remote(remote) => {
            let status = match remote.kind {
                RemoteErrorKind::NotFound => StatusCode::NOT_FOUND,
                RemoteErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
                RemoteErrorKind::Permanent => StatusCode::BAD_GATEWAY,
            };
            if status != StatusCode::NOT_FOUND {
                tracing::error!(error = %err, "scheduling backend failure");
            }
            (status, error_body(err.to_string()))
        }
        MarketplaceError::PartialFailure(partial) => (
            StatusCode::CONFLICT,
            serde_json::json!({
                "error": err.to_string(),
                "refetch": {
                    "exchange_shift_id": partial.exchange_shift_id.to_string(),
                    "request_id": partial.request_id.map(|id| id.to_string()),
                },
                "completed_steps": partial.completed_steps,
                "failed_step": partial.failed_step,
            }),
        ),
    }
}

impl From<MarketplaceError> for ApiError {
    fn from(err: MarketplaceError) -> Self {
        ApiError::Marketplace(err)
    }
}
