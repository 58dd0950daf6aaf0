pub mod config;
pub mod goal;
pub mod quote;
pub mod settings;
pub mod stats;
pub mod task;
pub mod timer;

use chrono::{Local, NaiveDate, Utc};
use focusdesk_core::{Config, Database, Event, FocusTracker, TrackerOptions, Transition};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Settings every command needs: loaded config and the effective user.
pub struct Context {
    pub config: Config,
    pub user_id: String,
}

impl Context {
    pub fn new(config: Config, user: Option<String>) -> Self {
        let user_id = user.unwrap_or_else(|| config.user_id.clone());
        Self { config, user_id }
    }

    pub fn open_db(&self) -> Result<Database, Box<dyn std::error::Error>> {
        let path = self.config.database_path()?;
        Ok(Database::open_at(&path)?)
    }

    /// Load this user's tracker, persist any defaults it created, and catch
    /// a running session up with the time that passed since it was saved.
    pub fn load_tracker(&self, db: &Database) -> Result<(FocusTracker, Vec<Event>), Box<dyn std::error::Error>> {
        let options = TrackerOptions::from(&self.config);
        let (mut tracker, work) = FocusTracker::load(db, &self.user_id, today(), options)?;
        work.apply(db).map_err(|(err, _)| err)?;
        let caught_up = tracker.reconcile(db, Utc::now(), &Local)?.commit(db)?;
        Ok((tracker, caught_up))
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Persist a transition and print its events.
pub fn commit_and_print(db: &Database, transition: Transition) -> CliResult {
    for event in transition.commit(db)? {
        print_json(&event)?;
    }
    Ok(())
}
