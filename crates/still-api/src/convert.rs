use tracing::warn;
use uuid::Uuid;

use still_db::models::{MoodRow, UrgeRow, UserRow};
use still_types::models::{Mood, Urge, UrgeStatus, User};

fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

/// Legacy or unknown status strings read back as PENDING.
pub(crate) fn status_or_pending(raw: &str) -> UrgeStatus {
    raw.parse().unwrap_or_else(|_| {
        warn!("Unknown urge status '{}', treating as PENDING", raw);
        UrgeStatus::Pending
    })
}

pub(crate) fn user(row: UserRow) -> User {
    User {
        id: parse_id(&row.id, "user id"),
        device_id: row.device_id,
        create_time: row.create_time,
        update_time: row.update_time,
    }
}

pub(crate) fn urge(row: UrgeRow) -> Urge {
    Urge {
        id: row.id,
        status: status_or_pending(&row.status),
        user_id: row.user_id.as_deref().map(|id| parse_id(id, "urge user_id")),
        urge_type: row.urge_type,
        count: row.count,
        create_time: row.create_time,
        update_time: row.update_time,
    }
}

pub(crate) fn mood(row: MoodRow) -> Mood {
    Mood {
        id: parse_id(&row.id, "mood id"),
        user_id: parse_id(&row.user_id, "mood user_id"),
        text: row.text,
        emoji: row.emoji,
        date: row.date,
        update_time: row.update_time,
    }
}
