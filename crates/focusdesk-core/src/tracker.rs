//! Per-user focus tracker: the session clock plus today's goal and the
//! running statistics, and the store writes each command implies.
//!
//! Only loading and [`FocusTracker::reconcile`] read the store. Every command
//! mutates memory first and returns a [`Transition`] whose [`UnitOfWork`] the
//! caller persists, either inline (CLI) or through the driver's write queue.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tracing::{debug, info};

use crate::error::{PersistenceError, ValidationError};
use crate::events::Event;
use crate::stats::{
    credit_focus_completion, DailyGoal, ProductivityStats, DEFAULT_AVERAGE_WINDOW_DAYS, DEFAULT_DAILY_TARGET,
};
use crate::storage::{Config, SessionStore, UnitOfWork, Write};
use crate::timer::{FocusSession, Phase, PhaseCompletion, SessionClock, TickOutcome, TimerSettings};

/// Defaults applied where a user has no saved record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerOptions {
    pub default_settings: TimerSettings,
    pub daily_target: u32,
    pub average_window_days: u32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            default_settings: TimerSettings::default(),
            daily_target: DEFAULT_DAILY_TARGET,
            average_window_days: DEFAULT_AVERAGE_WINDOW_DAYS,
        }
    }
}

impl From<&Config> for TrackerOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_settings: config.default_timer_settings(),
            daily_target: config.goals.daily_target,
            average_window_days: config.stats.average_window_days,
        }
    }
}

/// Result of one command: what happened and what must be written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transition {
    pub events: Vec<Event>,
    pub work: UnitOfWork,
}

impl Transition {
    fn new(user_id: &str) -> Self {
        Self {
            events: Vec::new(),
            work: UnitOfWork::new(user_id),
        }
    }

    /// The phase completion carried by this transition, if any.
    pub fn completion(&self) -> Option<(Phase, bool)> {
        self.events.iter().find_map(|ev| match ev {
            Event::PhaseCompleted {
                previous_phase,
                task_credited,
                ..
            } => Some((*previous_phase, *task_credited)),
            _ => None,
        })
    }

    /// Persist the writes inline and hand back the events.
    pub fn commit(self, store: &dyn SessionStore) -> Result<Vec<Event>, PersistenceError> {
        self.work.apply(store).map_err(|(err, _rest)| err)?;
        Ok(self.events)
    }
}

pub struct FocusTracker {
    user_id: String,
    clock: SessionClock,
    goal: DailyGoal,
    stats: ProductivityStats,
    options: TrackerOptions,
}

impl FocusTracker {
    /// Load a user's records, falling back to defaults for anything missing.
    ///
    /// A missing goal for `today` is created and returned as a pending write;
    /// a missing session stays in memory until the first command.
    pub fn load(
        store: &dyn SessionStore,
        user_id: &str,
        today: NaiveDate,
        options: TrackerOptions,
    ) -> Result<(Self, UnitOfWork), PersistenceError> {
        let settings = store.load_settings(user_id)?.unwrap_or(options.default_settings);
        let session = store
            .load_session(user_id)?
            .unwrap_or_else(|| FocusSession::new(&settings));
        let stats = store.load_stats(user_id)?.unwrap_or_default();

        let mut work = UnitOfWork::new(user_id);
        let goal = match store.load_daily_goal(user_id, today)? {
            Some(goal) => goal,
            None => {
                let goal = DailyGoal::new(today, options.daily_target);
                work.push(Write::DailyGoal(goal.clone()));
                goal
            }
        };

        debug!(user = user_id, phase = ?session.phase, running = session.is_running, "tracker loaded");
        let tracker = Self {
            user_id: user_id.to_string(),
            clock: SessionClock::from_parts(session, settings),
            goal,
            stats,
            options,
        };
        Ok((tracker, work))
    }

    /// In-memory tracker with defaults and no stored history.
    pub fn fresh(user_id: &str, today: NaiveDate, options: TrackerOptions) -> Self {
        Self {
            user_id: user_id.to_string(),
            clock: SessionClock::new(options.default_settings),
            goal: DailyGoal::new(today, options.daily_target),
            stats: ProductivityStats::default(),
            options,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn session(&self) -> &FocusSession {
        self.clock.session()
    }

    pub fn goal(&self) -> &DailyGoal {
        &self.goal
    }

    pub fn stats(&self) -> &ProductivityStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn snapshot(&self) -> Event {
        self.clock.snapshot()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Transition {
        let mut t = Transition::new(&self.user_id);
        if let Some(event) = self.clock.start() {
            info!(user = %self.user_id, phase = ?self.clock.phase(), "timer started");
            t.events.push(event);
            t.work.push(self.session_write());
        }
        t
    }

    pub fn pause(&mut self) -> Transition {
        let mut t = Transition::new(&self.user_id);
        if let Some(event) = self.clock.pause() {
            info!(user = %self.user_id, remaining = self.clock.seconds_remaining(), "timer paused");
            t.events.push(event);
            t.work.push(self.session_write());
        }
        t
    }

    pub fn reset(&mut self) -> Transition {
        let mut t = Transition::new(&self.user_id);
        t.events.push(self.clock.reset());
        t.work.push(self.session_write());
        info!(user = %self.user_id, "timer reset");
        t
    }

    /// One second of countdown. `today` dates any focus credit.
    pub fn tick(&mut self, today: NaiveDate) -> Transition {
        match self.clock.tick() {
            TickOutcome::Ignored => Transition::new(&self.user_id),
            TickOutcome::Counted { .. } => {
                let mut t = Transition::new(&self.user_id);
                t.work.push(self.session_write());
                t
            }
            TickOutcome::Completed(done) => self.finish_phase(done, today),
        }
    }

    /// Force the current phase to its end, crediting it as if it ran out.
    pub fn complete_phase(&mut self, today: NaiveDate) -> Transition {
        let done = self.clock.complete_phase();
        self.finish_phase(done, today)
    }

    pub fn apply_settings(&mut self, focus_minutes: u32, break_minutes: u32) -> Result<Transition, ValidationError> {
        let event = self.clock.apply_settings(focus_minutes, break_minutes)?;
        let mut t = Transition::new(&self.user_id);
        t.events.push(event);
        t.work.push(Write::Settings(*self.clock.settings()));
        t.work.push(self.session_write());
        Ok(t)
    }

    pub fn link_task(&mut self, task_id: Option<String>) -> Result<Transition, ValidationError> {
        let event = self.clock.link_task(task_id)?;
        let mut t = Transition::new(&self.user_id);
        t.events.push(event);
        t.work.push(self.session_write());
        Ok(t)
    }

    pub fn set_daily_target(&mut self, target: u32, today: NaiveDate) -> Result<Transition, ValidationError> {
        if target == 0 {
            return Err(ValidationError::OutOfRange {
                field: "daily_target",
                min: 1,
                max: u32::MAX,
                value: target,
            });
        }
        self.roll_day(today);
        self.goal.target = target;
        let mut t = Transition::new(&self.user_id);
        t.events.push(self.goal_event());
        t.work.push(Write::DailyGoal(self.goal.clone()));
        Ok(t)
    }

    /// Replay the whole seconds a running session missed while nobody was
    /// ticking it (reload, next CLI call). Stops at the first phase boundary.
    ///
    /// A focus phase that ran out is credited to the day it ended in `tz`.
    /// When that is an earlier day than the loaded goal, its goal record is
    /// read from `store`, credited, and the loaded goal is put back.
    pub fn reconcile<Tz: TimeZone>(
        &mut self,
        store: &dyn SessionStore,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<Transition, PersistenceError> {
        let updated_at = match self.clock.session().updated_at {
            Some(at) if self.clock.is_running() => at,
            _ => return Ok(Transition::new(&self.user_id)),
        };
        let elapsed = (now - updated_at).num_seconds().max(0);
        let missed = u32::try_from(elapsed).unwrap_or(u32::MAX).min(self.clock.seconds_remaining());
        if missed == 0 {
            return Ok(Transition::new(&self.user_id));
        }
        let ended_on = (updated_at + Duration::seconds(i64::from(missed)))
            .with_timezone(tz)
            .date_naive();
        debug!(user = %self.user_id, missed, %ended_on, "replaying missed ticks");

        let completes = missed == self.clock.seconds_remaining();
        if !completes || ended_on >= self.goal.date {
            return Ok(self.tick_many(missed, ended_on));
        }
        let past = store
            .load_daily_goal(&self.user_id, ended_on)?
            .unwrap_or_else(|| DailyGoal::new(ended_on, self.options.daily_target));
        let loaded = std::mem::replace(&mut self.goal, past);
        let t = self.tick_many(missed, ended_on);
        self.goal = loaded;
        Ok(t)
    }

    /// Up to `count` ticks as one transition with a single session write.
    /// Stops early once the phase completes.
    pub fn tick_many(&mut self, count: u32, today: NaiveDate) -> Transition {
        let mut t = Transition::new(&self.user_id);
        if !self.clock.is_running() {
            return t;
        }
        for _ in 0..count {
            let step = self.tick(today);
            t.events.extend(step.events);
            t.work.extend(step.work);
            if !self.clock.is_running() {
                break;
            }
        }
        // Only the newest session state matters.
        t.work.writes.retain(|w| !matches!(w, Write::Session(_)));
        t.work.push(self.session_write());
        t
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish_phase(&mut self, done: PhaseCompletion, today: NaiveDate) -> Transition {
        let mut t = Transition::new(&self.user_id);
        info!(
            user = %self.user_id,
            previous = ?done.previous_phase,
            task_credited = done.credited_task.is_some(),
            "phase completed"
        );
        t.events.push(done.event.clone());

        if done.previous_phase == Phase::Focus {
            self.roll_day(today);
            let (goal_changed, fresh) = credit_focus_completion(
                &mut self.goal,
                &mut self.stats,
                done.serial,
                done.focus_minutes,
                self.options.average_window_days,
            );

            if fresh {
                if let Some(task_id) = done.credited_task {
                    t.work.push(Write::TaskPomodoro(task_id));
                }
            } else {
                debug!(user = %self.user_id, serial = done.serial, "completion already credited");
            }
            if goal_changed {
                t.events.push(self.goal_event());
                t.work.push(Write::DailyGoal(self.goal.clone()));
            }
            if fresh {
                t.work.push(Write::Stats(self.stats.clone()));
            }
        }

        t.work.push(self.session_write());
        t
    }

    fn roll_day(&mut self, today: NaiveDate) {
        if self.goal.date != today {
            debug!(user = %self.user_id, from = %self.goal.date, to = %today, "new goal day");
            self.goal = DailyGoal::new(today, self.options.daily_target);
        }
    }

    fn goal_event(&self) -> Event {
        Event::DailyGoalChanged {
            date: self.goal.date,
            target: self.goal.target,
            achieved: self.goal.achieved,
            at: Utc::now(),
        }
    }

    fn session_write(&self) -> Write {
        Write::Session(self.clock.session().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, TaskStore};
    use crate::task::Task;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn labels(work: &UnitOfWork) -> Vec<&'static str> {
        work.writes.iter().map(Write::label).collect()
    }

    fn load(store: &MemoryStore) -> FocusTracker {
        let (tracker, work) = FocusTracker::load(store, "u1", today(), TrackerOptions::default()).unwrap();
        work.apply(store).unwrap();
        tracker
    }

    fn run_focus(tracker: &mut FocusTracker) -> Transition {
        tracker.start();
        let mut last = Transition::default();
        while tracker.is_running() {
            last = tracker.tick(today());
        }
        last
    }

    #[test]
    fn load_creates_defaults_and_todays_goal() {
        let store = MemoryStore::new();
        let (tracker, work) = FocusTracker::load(&store, "u1", today(), TrackerOptions::default()).unwrap();
        assert_eq!(labels(&work), vec!["daily_goal"]);
        assert_eq!(tracker.session().seconds_remaining, 1500);
        assert_eq!(tracker.goal().target, 8);
        assert_eq!(tracker.stats().total_completed_phases, 0);
    }

    #[test]
    fn commands_persist_session() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        tracker.start().commit(&store).unwrap();
        assert!(store.load_session("u1").unwrap().unwrap().is_running);

        // Second start is a no-op with nothing to write.
        assert!(tracker.start().work.is_empty());

        tracker.pause().commit(&store).unwrap();
        assert!(!store.load_session("u1").unwrap().unwrap().is_running);
    }

    #[test]
    fn focus_completion_writes_in_fixed_order() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        tracker.link_task(Some("task-9".into())).unwrap();

        let t = run_focus(&mut tracker);
        assert_eq!(labels(&t.work), vec!["task_pomodoro", "daily_goal", "stats", "session"]);
        assert_eq!(t.completion(), Some((Phase::Focus, true)));
        assert_eq!(tracker.goal().achieved, 1);
        assert_eq!(tracker.stats().total_focus_minutes, 25);
        assert_eq!(tracker.stats().daily_average_minutes, 1);
        assert_eq!(tracker.stats().longest_streak_days, 1);
    }

    #[test]
    fn break_completion_only_writes_session() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        run_focus(&mut tracker);
        let t = run_focus(&mut tracker);
        assert_eq!(labels(&t.work), vec!["session"]);
        assert_eq!(t.completion(), Some((Phase::Break, false)));
        assert_eq!(tracker.goal().achieved, 1);
    }

    #[test]
    fn completion_credits_linked_task_in_store() {
        let store = MemoryStore::new();
        let task = Task::new("u1", "write").unwrap();
        store.insert_task(&task).unwrap();
        let mut tracker = load(&store);
        tracker.link_task(Some(task.id.clone())).unwrap().commit(&store).unwrap();

        run_focus(&mut tracker).commit(&store).unwrap();
        assert_eq!(store.get_task(&task.id).unwrap().unwrap().pomodoros_completed, 1);
        assert_eq!(store.load_stats("u1").unwrap().unwrap().total_completed_phases, 1);
        assert_eq!(store.load_daily_goal("u1", today()).unwrap().unwrap().achieved, 1);
    }

    #[test]
    fn reset_does_not_touch_goal_or_stats() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        run_focus(&mut tracker);
        let t = tracker.reset();
        assert_eq!(labels(&t.work), vec!["session"]);
        assert_eq!(tracker.goal().achieved, 1);
        assert_eq!(tracker.stats().total_completed_phases, 1);
        assert_eq!(tracker.session().completed_focus_phases, 0);
    }

    #[test]
    fn replayed_completion_is_not_credited_twice() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        tracker.link_task(Some("t".into())).unwrap();
        tracker.start().commit(&store).unwrap();
        for _ in 0..1498 {
            tracker.tick(today());
        }
        let before = tracker.session().clone();
        assert_eq!(before.seconds_remaining, 2);
        tracker.tick(today()).commit(&store).unwrap();

        // Everything but the session write landed, then the process died.
        let completion = tracker.tick(today());
        let mut work = completion.work;
        work.writes.pop();
        work.apply(&store).unwrap();

        let (mut reloaded, _) = FocusTracker::load(&store, "u1", today(), TrackerOptions::default()).unwrap();
        assert_eq!(reloaded.session().phase, Phase::Focus);
        let replay = reloaded.tick(today());
        assert_eq!(replay.completion(), Some((Phase::Focus, true)));
        assert_eq!(labels(&replay.work), vec!["session"]);
        assert_eq!(reloaded.stats().total_completed_phases, 1);
        assert_eq!(reloaded.goal().achieved, 1);
    }

    #[test]
    fn goal_rolls_over_to_new_day() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        run_focus(&mut tracker);
        run_focus(&mut tracker);

        let tomorrow = today().succ_opt().unwrap();
        tracker.start();
        let mut t = Transition::default();
        while tracker.is_running() {
            t = tracker.tick(tomorrow);
        }
        assert_eq!(tracker.goal().date, tomorrow);
        assert_eq!(tracker.goal().achieved, 1);
        assert_eq!(tracker.stats().current_streak_days, 2);
        assert!(t.work.writes.contains(&Write::DailyGoal(tracker.goal().clone())));
    }

    #[test]
    fn set_daily_target_rejects_zero() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        assert!(tracker.set_daily_target(0, today()).is_err());
        let t = tracker.set_daily_target(4, today()).unwrap();
        assert_eq!(labels(&t.work), vec!["daily_goal"]);
        assert_eq!(tracker.goal().target, 4);
    }

    #[test]
    fn apply_settings_writes_settings_then_session() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        let t = tracker.apply_settings(10, 2).unwrap();
        assert_eq!(labels(&t.work), vec!["settings", "session"]);
        t.commit(&store).unwrap();
        assert_eq!(store.load_settings("u1").unwrap().unwrap().focus_minutes, 10);
        assert_eq!(tracker.session().seconds_remaining, 600);
    }

    #[test]
    fn reconcile_replays_elapsed_seconds() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        tracker.start();
        let started = tracker.session().updated_at.unwrap();

        let t = tracker
            .reconcile(&store, started + chrono::Duration::seconds(90), &Utc)
            .unwrap();
        assert_eq!(tracker.session().seconds_remaining, 1410);
        assert_eq!(labels(&t.work), vec!["session"]);
    }

    #[test]
    fn reconcile_stops_at_phase_boundary() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        tracker.start();
        let started = tracker.session().updated_at.unwrap();

        let t = tracker
            .reconcile(&store, started + chrono::Duration::hours(3), &Utc)
            .unwrap();
        assert_eq!(t.completion(), Some((Phase::Focus, false)));
        assert_eq!(tracker.session().phase, Phase::Break);
        assert!(!tracker.is_running());
        assert_eq!(tracker.session().seconds_remaining, 300);
        assert_eq!(tracker.stats().total_completed_phases, 1);
        assert_eq!(labels(&t.work), vec!["daily_goal", "stats", "session"]);
    }

    #[test]
    fn tick_many_collapses_session_writes() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        assert!(tracker.tick_many(10, today()).work.is_empty());

        tracker.start();
        let t = tracker.tick_many(60, today());
        assert_eq!(labels(&t.work), vec!["session"]);
        assert_eq!(tracker.session().seconds_remaining, 1440);

        let t = tracker.tick_many(5000, today());
        assert_eq!(labels(&t.work), vec!["daily_goal", "stats", "session"]);
        assert_eq!(tracker.session().seconds_remaining, 300);
        assert!(!tracker.is_running());
    }

    #[test]
    fn reconcile_ignores_idle_sessions() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        tracker.pause();
        let t = tracker
            .reconcile(&store, Utc::now() + chrono::Duration::hours(1), &Utc)
            .unwrap();
        assert!(t.work.is_empty());
        assert_eq!(tracker.session().seconds_remaining, 1500);
    }

    #[test]
    fn replay_on_next_day_does_not_credit_new_goal() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        tracker.start().commit(&store).unwrap();
        for _ in 0..1499 {
            tracker.tick(today());
        }
        store.save_session("u1", tracker.session()).unwrap();

        // The completion lands except for its session write.
        let mut work = tracker.tick(today()).work;
        work.writes.pop();
        work.apply(&store).unwrap();

        let tomorrow = today().succ_opt().unwrap();
        let (mut reloaded, created) = FocusTracker::load(&store, "u1", tomorrow, TrackerOptions::default()).unwrap();
        created.apply(&store).unwrap();
        let replay = reloaded.tick(tomorrow);
        assert_eq!(replay.completion(), Some((Phase::Focus, false)));
        assert_eq!(labels(&replay.work), vec!["session"]);
        assert_eq!(reloaded.goal().achieved, 0);
        assert_eq!(reloaded.stats().total_completed_phases, 1);
        assert_eq!(store.load_daily_goal("u1", today()).unwrap().unwrap().achieved, 1);
    }

    #[test]
    fn reconcile_credits_the_day_the_phase_ended() {
        let store = MemoryStore::new();
        let yesterday = today().pred_opt().unwrap();
        let mut earlier = DailyGoal::new(yesterday, 8);
        earlier.achieved = 2;
        store.save_daily_goal("u1", &earlier).unwrap();

        let mut tracker = load(&store);
        tracker.start();
        // Started half an hour before midnight, reloaded the next morning.
        let started = yesterday.and_hms_opt(23, 30, 0).unwrap().and_utc();
        let mut session = tracker.session().clone();
        session.updated_at = Some(started);
        store.save_session("u1", &session).unwrap();

        let mut reloaded = load(&store);
        let now = today().and_hms_opt(8, 0, 0).unwrap().and_utc();
        let t = reloaded.reconcile(&store, now, &Utc).unwrap();
        assert_eq!(t.completion(), Some((Phase::Focus, false)));
        t.commit(&store).unwrap();

        assert_eq!(store.load_daily_goal("u1", yesterday).unwrap().unwrap().achieved, 3);
        assert_eq!(store.load_daily_goal("u1", today()).unwrap().unwrap().achieved, 0);
        assert_eq!(reloaded.goal().date, today());
        assert_eq!(reloaded.stats().last_focus_date, Some(yesterday));
    }

    #[test]
    fn reconcile_past_midnight_boundary_uses_end_time() {
        let store = MemoryStore::new();
        let mut tracker = load(&store);
        tracker.start();
        // 20 minutes left at 23:55 on the previous day: the phase ends today.
        let started = today().pred_opt().unwrap().and_hms_opt(23, 55, 0).unwrap().and_utc();
        let mut session = tracker.session().clone();
        session.updated_at = Some(started);
        session.seconds_remaining = 1200;
        store.save_session("u1", &session).unwrap();

        let mut reloaded = load(&store);
        let now = today().and_hms_opt(9, 0, 0).unwrap().and_utc();
        reloaded.reconcile(&store, now, &Utc).unwrap().commit(&store).unwrap();
        assert_eq!(reloaded.goal().achieved, 1);
        assert_eq!(reloaded.stats().last_focus_date, Some(today()));
    }
}
