use axum::extract::State;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use still_types::api::{DeviceQuery, RegisterDeviceRequest, ValidationError};
use still_types::models::User;

use crate::convert;
use crate::error::{ApiError, ApiResult, success};
use crate::extract::{Json, Query};
use crate::state::{AppState, run_db};

/// POST /users/register. Find or create the user bound to a device.
pub async fn register_device(
    State(state): State<AppState>,
    Json(req): Json<RegisterDeviceRequest>,
) -> ApiResult<User> {
    req.validate()?;

    let candidate_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let row = run_db(&state, move |db| db.upsert_user(&candidate_id, &req.device_id, now)).await?;

    info!("Device registered for user {}", row.id);
    success(convert::user(row))
}

/// GET /users?deviceId=
pub async fn get_user_by_device_id(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> ApiResult<User> {
    let device_id = query
        .device_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ValidationError::new("deviceId", "Device ID is required"))?;

    let row = run_db(&state, move |db| db.get_user_by_device_id(&device_id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    success(convert::user(row))
}
