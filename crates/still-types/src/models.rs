use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome recorded for an urge once the delay is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UrgeStatus {
    /// Created, no outcome reported yet
    #[default]
    Pending,
    /// The user felt calm after waiting
    Peaceful,
    /// The urge was still there after waiting
    Present,
    /// The urge took over
    Overcome,
}

impl UrgeStatus {
    pub const ALL: [UrgeStatus; 4] = [
        UrgeStatus::Pending,
        UrgeStatus::Peaceful,
        UrgeStatus::Present,
        UrgeStatus::Overcome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Peaceful => "PEACEFUL",
            Self::Present => "PRESENT",
            Self::Overcome => "OVERCOME",
        }
    }
}

impl fmt::Display for UrgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown urge status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for UrgeStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UrgeStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub device_id: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Urge {
    pub id: i64,
    #[serde(rename = "type")]
    pub urge_type: String,
    /// Always 1: every delay action is its own row.
    pub count: i64,
    pub status: UrgeStatus,
    pub user_id: Option<Uuid>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mood {
    pub id: Uuid,
    pub text: String,
    pub emoji: Option<String>,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Per-status urge counts for one calendar day.
///
/// Keys are fixed; a status that never occurred on the day is still present
/// with a zero count. `total` always equals the sum of the four statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(rename = "PENDING", default)]
    pub pending: u32,
    #[serde(rename = "PEACEFUL", default)]
    pub peaceful: u32,
    #[serde(rename = "PRESENT", default)]
    pub present: u32,
    #[serde(rename = "OVERCOME", default)]
    pub overcome: u32,
    #[serde(default)]
    pub total: u32,
}

impl StatusCounts {
    pub fn record(&mut self, status: UrgeStatus) {
        match status {
            UrgeStatus::Pending => self.pending += 1,
            UrgeStatus::Peaceful => self.peaceful += 1,
            UrgeStatus::Present => self.present += 1,
            UrgeStatus::Overcome => self.overcome += 1,
        }
        self.total += 1;
    }

    pub fn get(&self, status: UrgeStatus) -> u32 {
        match status {
            UrgeStatus::Pending => self.pending,
            UrgeStatus::Peaceful => self.peaceful,
            UrgeStatus::Present => self.present,
            UrgeStatus::Overcome => self.overcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStatusCounts {
    /// `YYYY-MM-DD`
    pub date: String,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionMapData {
    pub daily_data: Vec<DailyStatusCounts>,
    pub total_days: usize,
}
