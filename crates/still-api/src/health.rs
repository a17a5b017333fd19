use axum::{
    Json,
    extract::State,
    http::{Method, Uri},
    response::IntoResponse,
};

use still_types::api::HealthStatus;

use crate::error::{ApiError, ApiResult, success};
use crate::state::AppState;

/// GET /health
pub async fn health() -> ApiResult<HealthStatus> {
    success(HealthStatus {
        status: "ok".to_string(),
    })
}

/// GET / service banner, returned outside the envelope.
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Still the Want API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment.as_str(),
        "timestamp": chrono::Utc::now(),
    }))
}

pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route not found: {} {}", method, uri.path()))
}
