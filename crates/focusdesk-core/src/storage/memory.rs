//! In-memory store for tests and embedding.
//!
//! Writes can be made to fail on demand to exercise the local-first
//! behaviour of the clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::store::{SessionStore, TaskStore};
use crate::error::PersistenceError;
use crate::stats::{DailyGoal, ProductivityStats};
use crate::task::{Task, TaskStatus};
use crate::timer::{FocusSession, TimerSettings};

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, FocusSession>,
    settings: HashMap<String, TimerSettings>,
    goals: HashMap<(String, NaiveDate), DailyGoal>,
    stats: HashMap<String, ProductivityStats>,
    tasks: Vec<Task>,
    /// Every successful write, in order, as `"<kind>:<user or task>"`.
    log: Vec<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Successful writes in application order.
    pub fn write_log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write<F>(&self, label: String, f: F) -> Result<(), PersistenceError>
    where
        F: FnOnce(&mut Tables),
    {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("writes disabled".into()));
        }
        let mut tables = self.lock();
        f(&mut tables);
        tables.log.push(label);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn load_session(&self, user_id: &str) -> Result<Option<FocusSession>, PersistenceError> {
        Ok(self.lock().sessions.get(user_id).cloned())
    }

    fn save_session(&self, user_id: &str, session: &FocusSession) -> Result<(), PersistenceError> {
        self.write(format!("session:{user_id}"), |t| {
            t.sessions.insert(user_id.to_string(), session.clone());
        })
    }

    fn load_settings(&self, user_id: &str) -> Result<Option<TimerSettings>, PersistenceError> {
        Ok(self.lock().settings.get(user_id).copied())
    }

    fn save_settings(&self, user_id: &str, settings: &TimerSettings) -> Result<(), PersistenceError> {
        self.write(format!("settings:{user_id}"), |t| {
            t.settings.insert(user_id.to_string(), *settings);
        })
    }

    fn load_daily_goal(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyGoal>, PersistenceError> {
        Ok(self.lock().goals.get(&(user_id.to_string(), date)).cloned())
    }

    fn save_daily_goal(&self, user_id: &str, goal: &DailyGoal) -> Result<(), PersistenceError> {
        self.write(format!("daily_goal:{user_id}"), |t| {
            t.goals.insert((user_id.to_string(), goal.date), goal.clone());
        })
    }

    fn load_stats(&self, user_id: &str) -> Result<Option<ProductivityStats>, PersistenceError> {
        Ok(self.lock().stats.get(user_id).cloned())
    }

    fn save_stats(&self, user_id: &str, stats: &ProductivityStats) -> Result<(), PersistenceError> {
        self.write(format!("stats:{user_id}"), |t| {
            t.stats.insert(user_id.to_string(), stats.clone());
        })
    }

    fn increment_task_pomodoro_count(&self, task_id: &str) -> Result<(), PersistenceError> {
        // A dangling link is not an error: the task may have been deleted.
        self.write(format!("task_pomodoro:{task_id}"), |t| {
            if let Some(task) = t.tasks.iter_mut().find(|task| task.id == task_id) {
                task.pomodoros_completed = task.pomodoros_completed.saturating_add(1);
            }
        })
    }
}

impl TaskStore for MemoryStore {
    fn insert_task(&self, task: &Task) -> Result<(), PersistenceError> {
        self.write(format!("task:{}", task.id), |t| t.tasks.push(task.clone()))
    }

    fn get_task(&self, task_id: &str) -> Result<Option<Task>, PersistenceError> {
        Ok(self.lock().tasks.iter().find(|t| t.id == task_id).cloned())
    }

    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, PersistenceError> {
        let mut tasks: Vec<Task> = self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    fn set_task_status(&self, user_id: &str, task_id: &str, status: TaskStatus) -> Result<bool, PersistenceError> {
        let mut found = false;
        self.write(format!("task:{task_id}"), |t| {
            if let Some(task) = t
                .tasks
                .iter_mut()
                .find(|task| task.id == task_id && task.user_id == user_id)
            {
                task.status = status;
                found = true;
            }
        })?;
        Ok(found)
    }

    fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool, PersistenceError> {
        let mut found = false;
        self.write(format!("task:{task_id}"), |t| {
            let before = t.tasks.len();
            t.tasks.retain(|task| !(task.id == task_id && task.user_id == user_id));
            found = t.tasks.len() != before;
        })?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_records_are_none() {
        let store = MemoryStore::new();
        assert!(store.load_session("u").unwrap().is_none());
        assert!(store.load_settings("u").unwrap().is_none());
        assert!(store.load_stats("u").unwrap().is_none());
        let day = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert!(store.load_daily_goal("u", day).unwrap().is_none());
    }

    #[test]
    fn failing_writes_leave_tables_untouched() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.save_session("u", &FocusSession::default()).is_err());
        assert!(store.load_session("u").unwrap().is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn increment_task_counter() {
        let store = MemoryStore::new();
        let task = Task::new("u", "read").unwrap();
        store.insert_task(&task).unwrap();
        store.increment_task_pomodoro_count(&task.id).unwrap();
        store.increment_task_pomodoro_count("missing").unwrap();
        assert_eq!(store.get_task(&task.id).unwrap().unwrap().pomodoros_completed, 1);
    }

    #[test]
    fn tasks_are_owner_filtered() {
        let store = MemoryStore::new();
        let mine = Task::new("me", "mine").unwrap();
        let theirs = Task::new("you", "theirs").unwrap();
        store.insert_task(&mine).unwrap();
        store.insert_task(&theirs).unwrap();
        assert_eq!(store.list_tasks("me").unwrap(), vec![mine.clone()]);
        assert!(!store.delete_task("me", &theirs.id).unwrap());
        assert!(store.delete_task("me", &mine.id).unwrap());
    }
}
