//! Persistence contract for focus sessions.
//!
//! A [`SessionStore`] is keyed by user id. Missing records are `Ok(None)`,
//! never an error. Writes produced by one clock command are grouped into a
//! [`UnitOfWork`] and applied in order.

use chrono::NaiveDate;
use tracing::warn;

use crate::error::PersistenceError;
use crate::stats::{DailyGoal, ProductivityStats};
use crate::task::{Task, TaskStatus};
use crate::timer::{FocusSession, TimerSettings};

pub trait SessionStore: Send + Sync {
    fn load_session(&self, user_id: &str) -> Result<Option<FocusSession>, PersistenceError>;
    fn save_session(&self, user_id: &str, session: &FocusSession) -> Result<(), PersistenceError>;

    fn load_settings(&self, user_id: &str) -> Result<Option<TimerSettings>, PersistenceError>;
    fn save_settings(&self, user_id: &str, settings: &TimerSettings) -> Result<(), PersistenceError>;

    fn load_daily_goal(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyGoal>, PersistenceError>;
    fn save_daily_goal(&self, user_id: &str, goal: &DailyGoal) -> Result<(), PersistenceError>;

    fn load_stats(&self, user_id: &str) -> Result<Option<ProductivityStats>, PersistenceError>;
    fn save_stats(&self, user_id: &str, stats: &ProductivityStats) -> Result<(), PersistenceError>;

    fn increment_task_pomodoro_count(&self, task_id: &str) -> Result<(), PersistenceError>;
}

/// Owner-filtered task records, for front ends that list and link tasks.
pub trait TaskStore: Send + Sync {
    fn insert_task(&self, task: &Task) -> Result<(), PersistenceError>;
    fn get_task(&self, task_id: &str) -> Result<Option<Task>, PersistenceError>;
    /// Newest first.
    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, PersistenceError>;
    /// Returns false if no such task exists for the user.
    fn set_task_status(&self, user_id: &str, task_id: &str, status: TaskStatus) -> Result<bool, PersistenceError>;
    /// Returns false if no such task exists for the user.
    fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool, PersistenceError>;
}

/// One record-level write.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    TaskPomodoro(String),
    DailyGoal(DailyGoal),
    Stats(ProductivityStats),
    Settings(TimerSettings),
    Session(FocusSession),
}

impl Write {
    fn apply(&self, store: &dyn SessionStore, user_id: &str) -> Result<(), PersistenceError> {
        match self {
            Write::TaskPomodoro(task_id) => store.increment_task_pomodoro_count(task_id),
            Write::DailyGoal(goal) => store.save_daily_goal(user_id, goal),
            Write::Stats(stats) => store.save_stats(user_id, stats),
            Write::Settings(settings) => store.save_settings(user_id, settings),
            Write::Session(session) => store.save_session(user_id, session),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Write::TaskPomodoro(_) => "task_pomodoro",
            Write::DailyGoal(_) => "daily_goal",
            Write::Stats(_) => "stats",
            Write::Settings(_) => "settings",
            Write::Session(_) => "session",
        }
    }
}

/// Ordered writes for one logical update of one user's records.
///
/// Phase completions are ordered task counter, daily goal, stats, session.
/// The session goes last so that, after a partial failure, the stored
/// session still describes the unfinished phase and the goal/stats serial
/// markers stop a replayed completion from counting twice.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitOfWork {
    pub user_id: String,
    pub writes: Vec<Write>,
}

impl UnitOfWork {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            writes: Vec::new(),
        }
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Append another unit's writes after this one's.
    pub fn extend(&mut self, other: UnitOfWork) {
        self.writes.extend(other.writes);
    }

    /// Apply writes in order, stopping at the first failure.
    ///
    /// On failure the returned unit holds the failed write and everything
    /// after it, ready to be retried.
    pub fn apply(self, store: &dyn SessionStore) -> Result<(), (PersistenceError, UnitOfWork)> {
        let mut writes = self.writes.into_iter();
        while let Some(write) = writes.next() {
            if let Err(err) = write.apply(store, &self.user_id) {
                warn!(user = %self.user_id, write = write.label(), error = %err, "store write failed");
                let mut rest = vec![write];
                rest.extend(writes);
                return Err((
                    err,
                    UnitOfWork {
                        user_id: self.user_id,
                        writes: rest,
                    },
                ));
            }
        }
        Ok(())
    }
}
