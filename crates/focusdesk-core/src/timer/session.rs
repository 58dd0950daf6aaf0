use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::{Phase, TimerSettings};

/// The single mutable record tracking a user's current timer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    /// Weak reference to a task; deleting the task does not touch this.
    pub linked_task_id: Option<String>,
    pub seconds_remaining: u32,
    pub is_running: bool,
    pub completed_focus_phases: u32,
    #[serde(default)]
    pub phase: Phase,
    /// Number of phase flips ever made by this session. Never reset.
    #[serde(default)]
    pub phase_serial: u64,
    /// Last time the record was mutated, used to replay missed ticks on reload.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FocusSession {
    /// Fresh idle focus session sized from `settings`.
    pub fn new(settings: &TimerSettings) -> Self {
        Self {
            linked_task_id: None,
            seconds_remaining: settings.seconds_for(Phase::Focus),
            is_running: false,
            completed_focus_phases: 0,
            phase: Phase::Focus,
            phase_serial: 0,
            updated_at: None,
        }
    }
}

impl Default for FocusSession {
    fn default() -> Self {
        Self::new(&TimerSettings::default())
    }
}
