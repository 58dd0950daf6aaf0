use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{ClockState, Phase};

/// Every state change of a focus session produces an Event.
/// Front ends render them; the driver broadcasts them to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero; the clock flipped phase and stopped.
    PhaseCompleted {
        previous_phase: Phase,
        task_credited: bool,
        completed_focus_phases: u32,
        at: DateTime<Utc>,
    },
    SettingsApplied {
        focus_minutes: u32,
        break_minutes: u32,
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    TaskLinked {
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    DailyGoalChanged {
        date: chrono::NaiveDate,
        target: u32,
        achieved: u32,
        at: DateTime<Utc>,
    },
    /// A queued write failed; in-memory state stays authoritative.
    PersistenceFailed {
        message: String,
        pending_writes: usize,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: ClockState,
        phase: Phase,
        seconds_remaining: u32,
        phase_total_secs: u32,
        completed_focus_phases: u32,
        linked_task_id: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short machine-friendly name, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerReset { .. } => "timer_reset",
            Event::PhaseCompleted { .. } => "phase_completed",
            Event::SettingsApplied { .. } => "settings_applied",
            Event::TaskLinked { .. } => "task_linked",
            Event::DailyGoalChanged { .. } => "daily_goal_changed",
            Event::PersistenceFailed { .. } => "persistence_failed",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}

/// Outbound hook for UI alerting on phase boundaries.
pub trait PhaseNotifier: Send + Sync {
    fn on_phase_completed(&self, previous_phase: Phase, task_credited: bool);
}

impl<F> PhaseNotifier for F
where
    F: Fn(Phase, bool) + Send + Sync,
{
    fn on_phase_completed(&self, previous_phase: Phase, task_credited: bool) {
        self(previous_phase, task_credited)
    }
}
