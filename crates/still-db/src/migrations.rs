use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Latest schema version this build knows how to create.
pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, urges, moods)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id           TEXT PRIMARY KEY,
                device_id    TEXT NOT NULL UNIQUE,
                create_time  TEXT NOT NULL,
                update_time  TEXT NOT NULL
            );

            CREATE TABLE urges (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                type         TEXT NOT NULL,
                count        INTEGER NOT NULL DEFAULT 1,
                status       TEXT NOT NULL DEFAULT 'PENDING',
                user_id      TEXT REFERENCES users(id) ON DELETE SET NULL,
                create_time  TEXT NOT NULL,
                update_time  TEXT NOT NULL
            );

            CREATE INDEX idx_urges_user_time
                ON urges(user_id, create_time);

            CREATE TABLE moods (
                id           TEXT PRIMARY KEY,
                text         TEXT NOT NULL,
                emoji        TEXT,
                user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                date         TEXT NOT NULL,
                update_time  TEXT NOT NULL
            );

            CREATE INDEX idx_moods_user_date
                ON moods(user_id, date);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
