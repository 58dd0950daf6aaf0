//! Session clock implementation.
//!
//! The clock is a tick-driven state machine with no internal thread. The
//! caller (the async driver, or a CLI invocation replaying elapsed time) is
//! responsible for calling `tick()` once per second while it runs.
//!
//! ## State Transitions
//!
//! ```text
//! IdleFocus --start--> RunningFocus --tick to 0--> IdleBreak
//! IdleBreak --start--> RunningBreak --tick to 0--> IdleFocus
//! Running*  --pause--> Idle*          any --reset--> IdleFocus
//! ```
//!
//! Reaching zero always stops the clock; the next phase needs an explicit
//! `start()`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::schedule::{Phase, TimerSettings};
use super::session::FocusSession;
use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    IdleFocus,
    RunningFocus,
    IdleBreak,
    RunningBreak,
}

impl ClockState {
    pub fn is_running(self) -> bool {
        matches!(self, ClockState::RunningFocus | ClockState::RunningBreak)
    }
}

/// What a finished phase is worth to the statistics side.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseCompletion {
    pub previous_phase: Phase,
    /// Task to credit, only set when a focus phase finished with a link.
    pub credited_task: Option<String>,
    /// Focus length in effect when the phase finished.
    pub focus_minutes: u32,
    /// Serial of the phase that just finished.
    pub serial: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Clock was not running.
    Ignored,
    Counted { seconds_remaining: u32 },
    Completed(PhaseCompletion),
}

/// Per-user countdown and phase state machine.
#[derive(Debug, Clone)]
pub struct SessionClock {
    session: FocusSession,
    settings: TimerSettings,
}

impl SessionClock {
    /// Create a clock in `IdleFocus` with a full focus countdown.
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            session: FocusSession::new(&settings),
            settings,
        }
    }

    /// Rebuild a clock from persisted parts.
    pub fn from_parts(session: FocusSession, settings: TimerSettings) -> Self {
        Self { session, settings }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &FocusSession {
        &self.session
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.session.seconds_remaining
    }

    pub fn state(&self) -> ClockState {
        match (self.session.phase, self.session.is_running) {
            (Phase::Focus, false) => ClockState::IdleFocus,
            (Phase::Focus, true) => ClockState::RunningFocus,
            (Phase::Break, false) => ClockState::IdleBreak,
            (Phase::Break, true) => ClockState::RunningBreak,
        }
    }

    /// Configured length of the current phase in seconds.
    pub fn phase_total_secs(&self) -> u32 {
        self.settings.seconds_for(self.session.phase)
    }

    /// 0.0 .. 1.0 share of the current phase still left.
    pub fn remaining_fraction(&self) -> f64 {
        let total = self.phase_total_secs();
        if total == 0 {
            return 0.0;
        }
        (self.session.seconds_remaining as f64 / total as f64).min(1.0)
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state(),
            phase: self.session.phase,
            seconds_remaining: self.session.seconds_remaining,
            phase_total_secs: self.phase_total_secs(),
            completed_focus_phases: self.session.completed_focus_phases,
            linked_task_id: self.session.linked_task_id.clone(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Returns `None` when already running.
    pub fn start(&mut self) -> Option<Event> {
        if self.session.is_running {
            return None;
        }
        self.session.is_running = true;
        self.touch();
        Some(Event::TimerStarted {
            phase: self.session.phase,
            seconds_remaining: self.session.seconds_remaining,
            at: Utc::now(),
        })
    }

    /// Returns `None` when not running.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.session.is_running {
            return None;
        }
        self.session.is_running = false;
        self.touch();
        Some(Event::TimerPaused {
            phase: self.session.phase,
            seconds_remaining: self.session.seconds_remaining,
            at: Utc::now(),
        })
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.session.is_running {
            return TickOutcome::Ignored;
        }
        let next = self.session.seconds_remaining.saturating_sub(1);
        if next == 0 {
            return TickOutcome::Completed(self.complete_phase());
        }
        self.session.seconds_remaining = next;
        self.touch();
        TickOutcome::Counted {
            seconds_remaining: next,
        }
    }

    /// Close the current phase: count it, flip, stop, and size the next one.
    pub fn complete_phase(&mut self) -> PhaseCompletion {
        let previous_phase = self.session.phase;
        let serial = self.session.phase_serial;

        let credited_task = if previous_phase == Phase::Focus {
            self.session.completed_focus_phases = self.session.completed_focus_phases.saturating_add(1);
            self.session.linked_task_id.clone()
        } else {
            None
        };

        let next = previous_phase.next();
        self.session.phase = next;
        self.session.seconds_remaining = self.settings.seconds_for(next);
        self.session.is_running = false;
        self.session.phase_serial = serial.saturating_add(1);
        self.touch();

        let event = Event::PhaseCompleted {
            previous_phase,
            task_credited: credited_task.is_some(),
            completed_focus_phases: self.session.completed_focus_phases,
            at: Utc::now(),
        };

        PhaseCompletion {
            previous_phase,
            credited_task,
            focus_minutes: self.settings.focus_minutes,
            serial,
            event,
        }
    }

    pub fn reset(&mut self) -> Event {
        let phase_serial = self.session.phase_serial;
        self.session = FocusSession {
            phase_serial,
            ..FocusSession::new(&self.settings)
        };
        self.touch();
        Event::TimerReset {
            seconds_remaining: self.session.seconds_remaining,
            at: Utc::now(),
        }
    }

    /// Validate and adopt new durations.
    ///
    /// An idle clock whose current phase length changed is resized. A
    /// running countdown keeps going and the new length applies from the
    /// next phase on.
    pub fn apply_settings(&mut self, focus_minutes: u32, break_minutes: u32) -> Result<Event, ValidationError> {
        let settings = TimerSettings::new(focus_minutes, break_minutes)?;
        let phase = self.session.phase;
        let changed = settings.minutes_for(phase) != self.settings.minutes_for(phase);
        self.settings = settings;
        if changed && !self.session.is_running {
            self.session.seconds_remaining = settings.seconds_for(phase);
        }
        self.touch();
        Ok(Event::SettingsApplied {
            focus_minutes,
            break_minutes,
            seconds_remaining: self.session.seconds_remaining,
            at: Utc::now(),
        })
    }

    pub fn link_task(&mut self, task_id: Option<String>) -> Result<Event, ValidationError> {
        if self.session.is_running {
            return Err(ValidationError::TaskLinkWhileRunning);
        }
        self.session.linked_task_id = task_id.clone();
        self.touch();
        Ok(Event::TaskLinked {
            task_id,
            at: Utc::now(),
        })
    }

    fn touch(&mut self) {
        self.session.updated_at = Some(Utc::now());
    }
}
