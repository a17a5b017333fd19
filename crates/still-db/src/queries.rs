use crate::models::{MoodRow, UrgeRow, UserRow};
use crate::{Database, time};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use still_types::models::UrgeStatus;

const USER_COLUMNS: &str = "id, device_id, create_time, update_time";
const URGE_COLUMNS: &str = "id, type, count, status, user_id, create_time, update_time";
const MOOD_COLUMNS: &str = "id, text, emoji, user_id, date, update_time";

impl Database {
    // -- Users --

    /// Insert a user for `device_id`, or touch `update_time` if one exists.
    /// `id` is only used when a new row is created; the stored row is returned
    /// either way.
    pub fn upsert_user(&self, id: &str, device_id: &str, now: DateTime<Utc>) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let ts = time::encode(now);
            tx.execute(
                "INSERT INTO users (id, device_id, create_time, update_time) VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(device_id) DO UPDATE SET update_time = excluded.update_time",
                (id, device_id, &ts),
            )?;
            let user = query_user(&tx, "device_id", device_id)?
                .ok_or_else(|| anyhow::anyhow!("User vanished after upsert: {}", device_id))?;
            tx.commit()?;
            Ok(user)
        })
    }

    pub fn get_user_by_device_id(&self, device_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "device_id", device_id))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        Ok(self.get_user_by_id(id)?.is_some())
    }

    // -- Urges --

    pub fn insert_urge(
        &self,
        urge_type: &str,
        user_id: Option<&str>,
        status: UrgeStatus,
        now: DateTime<Utc>,
    ) -> Result<UrgeRow> {
        self.with_conn_mut(|conn| {
            let ts = time::encode(now);
            conn.execute(
                "INSERT INTO urges (type, count, status, user_id, create_time, update_time)
                 VALUES (?1, 1, ?2, ?3, ?4, ?4)",
                rusqlite::params![urge_type, status.as_str(), user_id, &ts],
            )?;
            let id = conn.last_insert_rowid();
            query_urge(conn, id, None)?
                .ok_or_else(|| anyhow::anyhow!("Urge vanished after insert: {}", id))
        })
    }

    /// Set the status of urge `id`. When `owner` is given the urge must belong
    /// to that user. Returns `None`, without writing, if no urge matched.
    pub fn update_urge_status(
        &self,
        id: i64,
        status: UrgeStatus,
        owner: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<UrgeRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_urge(&tx, id, owner)?.is_none() {
                return Ok(None);
            }

            tx.execute(
                "UPDATE urges SET status = ?1, update_time = ?2 WHERE id = ?3",
                rusqlite::params![status.as_str(), time::encode(now), id],
            )?;
            let updated = query_urge(&tx, id, None)?;
            tx.commit()?;
            Ok(updated)
        })
    }

    pub fn get_urge(&self, id: i64) -> Result<Option<UrgeRow>> {
        self.with_conn(|conn| query_urge(conn, id, None))
    }

    /// Urges newest first, optionally filtered by user and capped at `limit`.
    pub fn get_urges(&self, user_id: Option<&str>, limit: Option<u32>) -> Result<Vec<UrgeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM urges
                 WHERE (?1 IS NULL OR user_id = ?1)
                 ORDER BY create_time DESC, id DESC
                 LIMIT ?2",
                URGE_COLUMNS
            );
            // SQLite treats a negative LIMIT as "no limit"
            let limit = limit.map(i64::from).unwrap_or(-1);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_urge)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_urges(&self, user_id: Option<&str>) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM urges WHERE (?1 IS NULL OR user_id = ?1)",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// A user's urges created within `[start, end]`, oldest first.
    pub fn get_urges_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UrgeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM urges
                 WHERE user_id = ?1 AND create_time >= ?2 AND create_time <= ?3
                 ORDER BY create_time ASC, id ASC",
                URGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![user_id, time::encode(start), time::encode(end)],
                    map_urge,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Moods --

    pub fn insert_mood(
        &self,
        id: &str,
        user_id: &str,
        text: &str,
        emoji: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MoodRow> {
        self.with_conn_mut(|conn| {
            let ts = time::encode(now);
            conn.execute(
                "INSERT INTO moods (id, text, emoji, user_id, date, update_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![id, text, emoji, user_id, &ts],
            )?;
            query_mood(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Mood vanished after insert: {}", id))
        })
    }

    pub fn get_mood(&self, id: &str) -> Result<Option<MoodRow>> {
        self.with_conn(|conn| query_mood(conn, id))
    }

    /// A user's moods, newest first.
    pub fn get_moods_for_user(&self, user_id: &str) -> Result<Vec<MoodRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM moods WHERE user_id = ?1 ORDER BY date DESC, id DESC",
                MOOD_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_mood)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replace text and emoji of a mood. Returns `None` if it does not exist.
    pub fn update_mood(
        &self,
        id: &str,
        text: &str,
        emoji: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<MoodRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE moods SET text = ?1, emoji = ?2, update_time = ?3 WHERE id = ?4",
                rusqlite::params![text, emoji, time::encode(now), id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_mood(conn, id)
        })
    }

    /// Returns whether a row was deleted.
    pub fn delete_mood(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM moods WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_user(conn: &Connection, key: &'static str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, key);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                device_id: row.get(1)?,
                create_time: time::column(row, 2)?,
                update_time: time::column(row, 3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_urge(conn: &Connection, id: i64, owner: Option<&str>) -> Result<Option<UrgeRow>> {
    let sql = format!(
        "SELECT {} FROM urges WHERE id = ?1 AND (?2 IS NULL OR user_id = ?2)",
        URGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row(rusqlite::params![id, owner], map_urge).optional()?;
    Ok(row)
}

fn query_mood(conn: &Connection, id: &str) -> Result<Option<MoodRow>> {
    let sql = format!("SELECT {} FROM moods WHERE id = ?1", MOOD_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_mood).optional()?;
    Ok(row)
}

fn map_urge(row: &Row<'_>) -> rusqlite::Result<UrgeRow> {
    Ok(UrgeRow {
        id: row.get(0)?,
        urge_type: row.get(1)?,
        count: row.get(2)?,
        status: row.get(3)?,
        user_id: row.get(4)?,
        create_time: time::column(row, 5)?,
        update_time: time::column(row, 6)?,
    })
}

fn map_mood(row: &Row<'_>) -> rusqlite::Result<MoodRow> {
    Ok(MoodRow {
        id: row.get(0)?,
        text: row.get(1)?,
        emoji: row.get(2)?,
        user_id: row.get(3)?,
        date: time::column(row, 4)?,
        update_time: time::column(row, 5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn upsert_keeps_first_id() {
        let db = db();
        let first = db.upsert_user("id-1", "device-a", at(8)).unwrap();
        let second = db.upsert_user("id-2", "device-a", at(9)).unwrap();

        assert_eq!(first.id, "id-1");
        assert_eq!(second.id, "id-1");
        assert_eq!(second.create_time, at(8));
        assert_eq!(second.update_time, at(9));
        assert!(db.get_user_by_id("id-2").unwrap().is_none());
    }

    #[test]
    fn new_urge_is_pending_with_count_one() {
        let db = db();
        db.upsert_user("u1", "device", at(8)).unwrap();
        let urge = db.insert_urge("urge", Some("u1"), UrgeStatus::Pending, at(9)).unwrap();

        assert_eq!(urge.count, 1);
        assert_eq!(urge.status, "PENDING");
        assert_eq!(urge.user_id.as_deref(), Some("u1"));
        assert_eq!(urge.create_time, at(9));
    }

    #[test]
    fn update_status_checks_owner() {
        let db = db();
        db.upsert_user("u1", "device-1", at(8)).unwrap();
        db.upsert_user("u2", "device-2", at(8)).unwrap();
        let urge = db.insert_urge("urge", Some("u1"), UrgeStatus::Pending, at(9)).unwrap();

        let denied = db
            .update_urge_status(urge.id, UrgeStatus::Peaceful, Some("u2"), at(10))
            .unwrap();
        assert!(denied.is_none());
        let untouched = db.get_urge(urge.id).unwrap().unwrap();
        assert_eq!(untouched.status, "PENDING");
        assert_eq!(untouched.update_time, at(9));

        let updated = db
            .update_urge_status(urge.id, UrgeStatus::Peaceful, Some("u1"), at(10))
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "PEACEFUL");
        assert_eq!(updated.update_time, at(10));

        assert!(db.update_urge_status(9999, UrgeStatus::Present, None, at(11)).unwrap().is_none());
    }

    #[test]
    fn urges_listed_newest_first_with_limit() {
        let db = db();
        db.upsert_user("u1", "device", at(0)).unwrap();
        for hour in 1..=5 {
            db.insert_urge("urge", Some("u1"), UrgeStatus::Pending, at(hour)).unwrap();
        }
        db.insert_urge("urge", None, UrgeStatus::Pending, at(6)).unwrap();

        let all = db.get_urges(None, None).unwrap();
        assert_eq!(all.len(), 6);
        assert!(all[0].user_id.is_none());

        let recent = db.get_urges(Some("u1"), Some(2)).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].create_time, at(5));
        assert_eq!(recent[1].create_time, at(4));

        assert_eq!(db.count_urges(Some("u1")).unwrap(), 5);
        assert_eq!(db.count_urges(None).unwrap(), 6);
    }

    #[test]
    fn urges_between_is_inclusive_and_ascending() {
        let db = db();
        db.upsert_user("u1", "device", at(0)).unwrap();
        for hour in [3, 1, 2, 9] {
            db.insert_urge("urge", Some("u1"), UrgeStatus::Pending, at(hour)).unwrap();
        }

        let rows = db.get_urges_between("u1", at(1), at(3)).unwrap();
        let hours: Vec<_> = rows.iter().map(|r| r.create_time).collect();
        assert_eq!(hours, vec![at(1), at(2), at(3)]);

        let empty = db
            .get_urges_between("u1", at(10), at(10) + Duration::hours(1))
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn mood_crud() {
        let db = db();
        db.upsert_user("u1", "device", at(0)).unwrap();

        let mood = db.insert_mood("m1", "u1", "calm", Some("🙂"), at(1)).unwrap();
        assert_eq!(mood.emoji.as_deref(), Some("🙂"));
        db.insert_mood("m2", "u1", "tired", None, at(2)).unwrap();

        let moods = db.get_moods_for_user("u1").unwrap();
        assert_eq!(moods.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["m2", "m1"]);

        let updated = db.update_mood("m1", "better", None, at(3)).unwrap().unwrap();
        assert_eq!(updated.text, "better");
        assert!(updated.emoji.is_none());
        assert_eq!(updated.date, at(1));
        assert_eq!(updated.update_time, at(3));
        assert!(db.update_mood("missing", "x", None, at(3)).unwrap().is_none());

        assert!(db.delete_mood("m1").unwrap());
        assert!(!db.delete_mood("m1").unwrap());
        assert!(db.get_mood("m1").unwrap().is_none());
    }

    #[test]
    fn mood_requires_existing_user() {
        let db = db();
        assert!(db.insert_mood("m1", "ghost", "hello", None, at(1)).is_err());
    }
}
