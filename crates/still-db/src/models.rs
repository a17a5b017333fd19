//! Database row types. These map directly to SQLite rows and are kept apart
//! from the `still-types` wire models so the storage layer stays independent.

use chrono::{DateTime, Utc};

pub struct UserRow {
    pub id: String,
    pub device_id: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

pub struct UrgeRow {
    pub id: i64,
    pub urge_type: String,
    pub count: i64,
    /// Raw column value; rows written by older builds may hold strings that
    /// are not a current `UrgeStatus`.
    pub status: String,
    pub user_id: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

pub struct MoodRow {
    pub id: String,
    pub text: String,
    pub emoji: Option<String>,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}
