//! Database schema migrations for focusdesk.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);
    debug!(current_version, target = SCHEMA_VERSION, "checking schema");

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (fresh database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0))
        .unwrap_or_else(|e| {
            if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                warn!(error = %e, "failed to read schema_version");
            }
            0
        })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: per-user session, settings, goal, stats and task tables.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS focus_sessions (
            user_id                TEXT PRIMARY KEY,
            linked_task_id         TEXT,
            seconds_remaining      INTEGER NOT NULL,
            is_running             INTEGER NOT NULL,
            completed_focus_phases INTEGER NOT NULL,
            phase                  TEXT NOT NULL,
            phase_serial           INTEGER NOT NULL DEFAULT 0,
            updated_at             TEXT
        );

        CREATE TABLE IF NOT EXISTS timer_settings (
            user_id       TEXT PRIMARY KEY,
            focus_minutes INTEGER NOT NULL,
            break_minutes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_goals (
            user_id              TEXT NOT NULL,
            date                 TEXT NOT NULL,
            target               INTEGER NOT NULL,
            achieved             INTEGER NOT NULL,
            last_credited_serial INTEGER,
            PRIMARY KEY (user_id, date)
        );

        CREATE TABLE IF NOT EXISTS productivity_stats (
            user_id                TEXT PRIMARY KEY,
            total_completed_phases INTEGER NOT NULL,
            total_focus_minutes    INTEGER NOT NULL,
            longest_streak_days    INTEGER NOT NULL,
            daily_average_minutes  INTEGER NOT NULL,
            current_streak_days    INTEGER NOT NULL DEFAULT 0,
            last_focus_date        TEXT,
            last_credited_serial   INTEGER
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL,
            text                TEXT NOT NULL,
            status              TEXT NOT NULL DEFAULT 'pending',
            created_at          TEXT NOT NULL,
            pomodoros_completed INTEGER NOT NULL DEFAULT 0
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: indexes for owner-filtered listings.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_tasks_user_created ON tasks(user_id, created_at);
         CREATE INDEX IF NOT EXISTS idx_daily_goals_user ON daily_goals(user_id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
