use axum::extract::State;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use still_types::api::{
    CreateMoodRequest, DeletedResponse, MoodQuery, MoodResponse, MoodsResponse, UpdateMoodRequest,
    ValidationError,
};

use crate::convert;
use crate::error::{ApiError, ApiResult, success};
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, run_db};

/// POST /moods
pub async fn create_mood(
    State(state): State<AppState>,
    Json(req): Json<CreateMoodRequest>,
) -> ApiResult<MoodResponse> {
    req.validate()?;

    let mood_id = Uuid::new_v4().to_string();
    let user_id = req.user_id.to_string();
    let now = Utc::now();

    let row = run_db(&state, move |db| {
        if !db.user_exists(&user_id)? {
            return Ok(None);
        }
        db.insert_mood(&mood_id, &user_id, &req.text, req.emoji.as_deref(), now)
            .map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!("Mood {} created", row.id);
    success(MoodResponse {
        mood: convert::mood(row),
    })
}

/// GET /moods/user/{user_id}
pub async fn get_user_moods(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<MoodsResponse> {
    list_moods(&state, user_id).await
}

/// GET /moods?userId=
pub async fn get_moods(
    State(state): State<AppState>,
    Query(query): Query<MoodQuery>,
) -> ApiResult<MoodsResponse> {
    let user_id = query
        .user_id()
        .ok_or_else(|| ValidationError::new("userId", "User ID is required"))?
        .to_string();
    list_moods(&state, user_id).await
}

// IDs are matched as stored text, so a malformed one is simply unknown.
async fn list_moods(state: &AppState, uid: String) -> ApiResult<MoodsResponse> {
    let rows = run_db(state, move |db| {
        if !db.user_exists(&uid)? {
            return Ok(None);
        }
        db.get_moods_for_user(&uid).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    success(MoodsResponse {
        moods: rows.into_iter().map(convert::mood).collect(),
    })
}

/// GET /moods/{mood_id}
pub async fn get_mood(
    State(state): State<AppState>,
    Path(mood_id): Path<String>,
) -> ApiResult<MoodResponse> {
    let row = run_db(&state, move |db| db.get_mood(&mood_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Mood not found"))?;

    success(MoodResponse {
        mood: convert::mood(row),
    })
}

/// PUT /moods/{mood_id}
pub async fn update_mood(
    State(state): State<AppState>,
    Path(mood_id): Path<String>,
    Json(req): Json<UpdateMoodRequest>,
) -> ApiResult<MoodResponse> {
    req.validate()?;

    let now = Utc::now();
    let row = run_db(&state, move |db| {
        db.update_mood(&mood_id, &req.text, req.emoji.as_deref(), now)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Mood not found"))?;

    success(MoodResponse {
        mood: convert::mood(row),
    })
}

/// DELETE /moods/{mood_id}
pub async fn delete_mood(
    State(state): State<AppState>,
    Path(mood_id): Path<String>,
) -> ApiResult<DeletedResponse> {
    let id = mood_id.clone();
    let deleted = run_db(&state, move |db| db.delete_mood(&id)).await?;
    if !deleted {
        return Err(ApiError::not_found("Mood not found"));
    }

    info!("Mood {} deleted", mood_id);
    success(DeletedResponse {
        success: true,
        message: "Mood deleted successfully".to_string(),
    })
}
