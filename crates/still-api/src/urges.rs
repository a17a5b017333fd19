use axum::extract::State;
use chrono::Utc;
use tracing::{debug, info};

use still_types::api::{
    DelayUrgeRequest, EmotionMapQuery, RECENT_URGES_LIMIT, UpdateUrgeStatusRequest, UrgeQuery,
    UrgeStats, UrgesResponse,
};
use still_types::models::{EmotionMapData, Urge};

use crate::convert;
use crate::emotion_map;
use crate::error::{ApiError, ApiResult, success};
use crate::extract::{Json, Query};
use crate::state::{AppState, run_db};

/// POST /urges/delay. Every call records a new urge with count 1.
pub async fn delay_urge(
    State(state): State<AppState>,
    Json(req): Json<DelayUrgeRequest>,
) -> ApiResult<Urge> {
    req.validate()?;

    let status = req.status.unwrap_or_default();
    let user_id = req.user_id.map(|id| id.to_string());
    let now = Utc::now();

    let row = run_db(&state, move |db| {
        if let Some(uid) = user_id.as_deref() {
            if !db.user_exists(uid)? {
                return Ok(None);
            }
        }
        db.insert_urge(&req.urge_type, user_id.as_deref(), status, now).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!("Urge {} recorded with status {}", row.id, row.status);
    success(convert::urge(row))
}

/// POST /urges/update
pub async fn update_urge_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateUrgeStatusRequest>,
) -> ApiResult<Urge> {
    let owner = req.user_id.map(|id| id.to_string());
    let now = Utc::now();

    let row = run_db(&state, move |db| {
        db.update_urge_status(req.id, req.status, owner.as_deref(), now)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Urge not found or does not belong to the user"))?;

    info!("Urge {} moved to {}", row.id, row.status);
    success(convert::urge(row))
}

/// GET /urges?userId=
pub async fn get_urges(
    State(state): State<AppState>,
    Query(query): Query<UrgeQuery>,
) -> ApiResult<UrgesResponse> {
    let user_id = query.user_id().map(str::to_string);
    let rows = run_db(&state, move |db| db.get_urges(user_id.as_deref(), None)).await?;

    success(UrgesResponse {
        urges: rows.into_iter().map(convert::urge).collect(),
    })
}

/// GET /urges/stats?userId=
pub async fn get_urge_stats(
    State(state): State<AppState>,
    Query(query): Query<UrgeQuery>,
) -> ApiResult<UrgeStats> {
    let user_id = query.user_id().map(str::to_string);
    let (total, recent) = run_db(&state, move |db| {
        let total = db.count_urges(user_id.as_deref())?;
        let recent = db.get_urges(user_id.as_deref(), Some(RECENT_URGES_LIMIT))?;
        Ok((total, recent))
    })
    .await?;

    success(UrgeStats {
        total,
        recent: recent.into_iter().map(convert::urge).collect(),
    })
}

/// GET /urges/emotion-map?userId=&weeks=
pub async fn get_emotion_map(
    State(state): State<AppState>,
    Query(query): Query<EmotionMapQuery>,
) -> ApiResult<EmotionMapData> {
    query.validate()?;

    let (start, end) = emotion_map::window(Utc::now(), query.weeks);
    let user_id = query.user_id.to_string();
    let rows = run_db(&state, move |db| db.get_urges_between(&user_id, start, end)).await?;

    let data = emotion_map::aggregate(rows.iter().map(|r| (r.create_time, r.status.as_str())));
    debug!(
        "Emotion map for {}: {} urges over {} days ({} weeks)",
        query.user_id,
        rows.len(),
        data.total_days,
        query.weeks
    );

    success(data)
}
