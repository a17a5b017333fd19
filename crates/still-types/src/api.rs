use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Mood, Urge, UrgeStatus};

/// Window used by the emotion map when the caller does not pass `weeks`.
pub const DEFAULT_EMOTION_MAP_WEEKS: u32 = 7;
/// Upper bound on `weeks`, ten years of history.
pub const MAX_EMOTION_MAP_WEEKS: u32 = 520;
/// Number of urges returned in `UrgeStats::recent`.
pub const RECENT_URGES_LIMIT: u32 = 10;

// -- Envelope --

/// Every response body: `{success, data}` on success, `{success, message}` on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

// -- Validation --

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// -- Health --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub device_id: String,
}

impl RegisterDeviceRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.device_id.trim().is_empty() {
            return Err(ValidationError::new("deviceId", "Device ID is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

// -- Urges --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayUrgeRequest {
    #[serde(rename = "type")]
    pub urge_type: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UrgeStatus>,
}

impl DelayUrgeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.urge_type.trim().is_empty() {
            return Err(ValidationError::new("type", "Urge type cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUrgeStatusRequest {
    pub id: i64,
    pub status: UrgeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgeQuery {
    pub user_id: Option<String>,
}

impl UrgeQuery {
    /// `?userId=` with an empty value means no filter.
    pub fn user_id(&self) -> Option<&str> {
        non_empty(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionMapQuery {
    pub user_id: Uuid,
    #[serde(default = "default_weeks")]
    pub weeks: u32,
}

fn default_weeks() -> u32 {
    DEFAULT_EMOTION_MAP_WEEKS
}

impl EmotionMapQuery {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.weeks == 0 || self.weeks > MAX_EMOTION_MAP_WEEKS {
            return Err(ValidationError::new(
                "weeks",
                format!("weeks must be between 1 and {}", MAX_EMOTION_MAP_WEEKS),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgesResponse {
    pub urges: Vec<Urge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgeStats {
    pub total: i64,
    pub recent: Vec<Urge>,
}

// -- Moods --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMoodRequest {
    pub user_id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl CreateMoodRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_mood_text(&self.text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMoodRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl UpdateMoodRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_mood_text(&self.text)
    }
}

fn validate_mood_text(text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::new("text", "Mood text cannot be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodQuery {
    pub user_id: Option<String>,
}

impl MoodQuery {
    pub fn user_id(&self) -> Option<&str> {
        non_empty(&self.user_id)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodResponse {
    pub mood: Mood,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodsResponse {
    pub moods: Vec<Mood>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}
