mod engine;
mod schedule;
mod session;

pub use engine::{ClockState, PhaseCompletion, SessionClock, TickOutcome};
pub use schedule::{
    Phase, TimerSettings, BREAK_MINUTES_RANGE, DEFAULT_BREAK_MINUTES, DEFAULT_FOCUS_MINUTES,
    FOCUS_MINUTES_RANGE,
};
pub use session::FocusSession;
