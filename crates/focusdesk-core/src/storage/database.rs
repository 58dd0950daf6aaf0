//! SQLite-backed session store.
//!
//! Provides persistent storage for:
//! - The in-progress focus session and timer settings per user
//! - Daily goals and running productivity statistics
//! - Task records and their pomodoro counters

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::warn;

use super::data_dir;
use super::migrations;
use super::store::{SessionStore, TaskStore};
use crate::error::PersistenceError;
use crate::stats::{DailyGoal, ProductivityStats};
use crate::task::{Task, TaskStatus};
use crate::timer::{FocusSession, Phase, TimerSettings};

const DATE_FMT: &str = "%Y-%m-%d";

/// SQLite database implementing [`SessionStore`] and [`TaskStore`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/focusdesk/focusdesk.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, PersistenceError> {
        let dir = data_dir().map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        Self::open_at(&dir.join("focusdesk.db"))
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path).map_err(|source| PersistenceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!(error = %e, "failed to enable WAL mode");
        }
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        migrations::migrate(&conn).map_err(|e| PersistenceError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn corrupt(key: &str, message: impl Into<String>) -> PersistenceError {
    PersistenceError::Corrupt {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, PersistenceError> {
    NaiveDate::parse_from_str(value, DATE_FMT).map_err(|e| corrupt(key, format!("bad date '{value}': {e}")))
}

fn parse_datetime(key: &str, value: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(key, format!("bad timestamp '{value}': {e}")))
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, String, u32)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build_task(raw: (String, String, String, String, String, u32)) -> Result<Task, PersistenceError> {
    let (id, user_id, text, status, created_at, pomodoros_completed) = raw;
    let status = TaskStatus::parse(&status).ok_or_else(|| corrupt(&id, format!("bad status '{status}'")))?;
    let created_at = parse_datetime(&id, &created_at)?;
    Ok(Task {
        id,
        user_id,
        text,
        status,
        created_at,
        pomodoros_completed,
    })
}

impl SessionStore for Database {
    fn load_session(&self, user_id: &str) -> Result<Option<FocusSession>, PersistenceError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT linked_task_id, seconds_remaining, is_running, completed_focus_phases,
                        phase, phase_serial, updated_at
                 FROM focus_sessions WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, u64>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((linked_task_id, seconds_remaining, is_running, completed, phase, serial, updated_at)) = row else {
            return Ok(None);
        };
        let phase = Phase::parse(&phase).ok_or_else(|| corrupt(user_id, format!("bad phase '{phase}'")))?;
        let updated_at = updated_at.as_deref().map(|v| parse_datetime(user_id, v)).transpose()?;

        Ok(Some(FocusSession {
            linked_task_id,
            seconds_remaining,
            is_running,
            completed_focus_phases: completed,
            phase,
            phase_serial: serial,
            updated_at,
        }))
    }

    fn save_session(&self, user_id: &str, session: &FocusSession) -> Result<(), PersistenceError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO focus_sessions
                (user_id, linked_task_id, seconds_remaining, is_running, completed_focus_phases,
                 phase, phase_serial, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user_id,
                session.linked_task_id,
                session.seconds_remaining,
                session.is_running,
                session.completed_focus_phases,
                session.phase.as_str(),
                session.phase_serial,
                session.updated_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn load_settings(&self, user_id: &str) -> Result<Option<TimerSettings>, PersistenceError> {
        let settings = self
            .conn()
            .query_row(
                "SELECT focus_minutes, break_minutes FROM timer_settings WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(TimerSettings {
                        focus_minutes: row.get(0)?,
                        break_minutes: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    fn save_settings(&self, user_id: &str, settings: &TimerSettings) -> Result<(), PersistenceError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO timer_settings (user_id, focus_minutes, break_minutes)
             VALUES (?1, ?2, ?3)",
            params![user_id, settings.focus_minutes, settings.break_minutes],
        )?;
        Ok(())
    }

    fn load_daily_goal(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyGoal>, PersistenceError> {
        let goal = self
            .conn()
            .query_row(
                "SELECT target, achieved, last_credited_serial
                 FROM daily_goals WHERE user_id = ?1 AND date = ?2",
                params![user_id, date.format(DATE_FMT).to_string()],
                |row| {
                    Ok(DailyGoal {
                        date,
                        target: row.get(0)?,
                        achieved: row.get(1)?,
                        last_credited_serial: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(goal)
    }

    fn save_daily_goal(&self, user_id: &str, goal: &DailyGoal) -> Result<(), PersistenceError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO daily_goals (user_id, date, target, achieved, last_credited_serial)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                goal.date.format(DATE_FMT).to_string(),
                goal.target,
                goal.achieved,
                goal.last_credited_serial,
            ],
        )?;
        Ok(())
    }

    fn load_stats(&self, user_id: &str) -> Result<Option<ProductivityStats>, PersistenceError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT total_completed_phases, total_focus_minutes, longest_streak_days,
                        daily_average_minutes, current_streak_days, last_focus_date,
                        last_credited_serial
                 FROM productivity_stats WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, u64>(0)?,
                        row.get::<_, u64>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, u64>(3)?,
                        row.get::<_, u32>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<u64>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((total, minutes, longest, average, current, last_date, last_serial)) = row else {
            return Ok(None);
        };
        let last_focus_date = last_date.as_deref().map(|v| parse_date(user_id, v)).transpose()?;

        Ok(Some(ProductivityStats {
            total_completed_phases: total,
            total_focus_minutes: minutes,
            longest_streak_days: longest,
            daily_average_minutes: average,
            current_streak_days: current,
            last_focus_date,
            last_credited_serial: last_serial,
        }))
    }

    fn save_stats(&self, user_id: &str, stats: &ProductivityStats) -> Result<(), PersistenceError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO productivity_stats
                (user_id, total_completed_phases, total_focus_minutes, longest_streak_days,
                 daily_average_minutes, current_streak_days, last_focus_date, last_credited_serial)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user_id,
                stats.total_completed_phases,
                stats.total_focus_minutes,
                stats.longest_streak_days,
                stats.daily_average_minutes,
                stats.current_streak_days,
                stats.last_focus_date.map(|d| d.format(DATE_FMT).to_string()),
                stats.last_credited_serial,
            ],
        )?;
        Ok(())
    }

    fn increment_task_pomodoro_count(&self, task_id: &str) -> Result<(), PersistenceError> {
        // Zero rows touched means the task was deleted; the link is weak.
        self.conn().execute(
            "UPDATE tasks SET pomodoros_completed = pomodoros_completed + 1 WHERE id = ?1",
            params![task_id],
        )?;
        Ok(())
    }
}

impl TaskStore for Database {
    fn insert_task(&self, task: &Task) -> Result<(), PersistenceError> {
        self.conn().execute(
            "INSERT INTO tasks (id, user_id, text, status, created_at, pomodoros_completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.id,
                task.user_id,
                task.text,
                task.status.as_str(),
                task.created_at.to_rfc3339(),
                task.pomodoros_completed,
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, task_id: &str) -> Result<Option<Task>, PersistenceError> {
        let raw = self
            .conn()
            .query_row(
                "SELECT id, user_id, text, status, created_at, pomodoros_completed
                 FROM tasks WHERE id = ?1",
                params![task_id],
                task_from_row,
            )
            .optional()?;
        raw.map(build_task).transpose()
    }

    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, PersistenceError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, text, status, created_at, pomodoros_completed
             FROM tasks WHERE user_id = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], task_from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(build_task(row?)?);
        }
        Ok(tasks)
    }

    fn set_task_status(&self, user_id: &str, task_id: &str, status: TaskStatus) -> Result<bool, PersistenceError> {
        let changed = self.conn().execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2 AND user_id = ?3",
            params![status.as_str(), task_id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool, PersistenceError> {
        let changed = self.conn().execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id],
        )?;
        Ok(changed > 0)
    }
}
