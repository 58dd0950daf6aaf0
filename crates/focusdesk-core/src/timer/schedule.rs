use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const FOCUS_MINUTES_RANGE: (u32, u32) = (1, 60);
pub const BREAK_MINUTES_RANGE: (u32, u32) = (1, 30);

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// The two alternating countdown modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Focus,
    Break,
}

impl Phase {
    pub fn next(self) -> Self {
        match self {
            Phase::Focus => Phase::Break,
            Phase::Break => Phase::Focus,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Focus => "focus",
            Phase::Break => "break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(Phase::Focus),
            "break" => Some(Phase::Break),
            _ => None,
        }
    }
}

/// Per-user phase durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub focus_minutes: u32,
    pub break_minutes: u32,
}

impl TimerSettings {
    /// Build settings, rejecting values outside the allowed ranges.
    pub fn new(focus_minutes: u32, break_minutes: u32) -> Result<Self, ValidationError> {
        check_range("focus_minutes", focus_minutes, FOCUS_MINUTES_RANGE)?;
        check_range("break_minutes", break_minutes, BREAK_MINUTES_RANGE)?;
        Ok(Self {
            focus_minutes,
            break_minutes,
        })
    }

    /// Build settings, pulling out-of-range values to the nearest bound.
    pub fn clamped(focus_minutes: u32, break_minutes: u32) -> Self {
        Self {
            focus_minutes: focus_minutes.clamp(FOCUS_MINUTES_RANGE.0, FOCUS_MINUTES_RANGE.1),
            break_minutes: break_minutes.clamp(BREAK_MINUTES_RANGE.0, BREAK_MINUTES_RANGE.1),
        }
    }

    pub fn minutes_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Focus => self.focus_minutes,
            Phase::Break => self.break_minutes,
        }
    }

    /// Phase duration in seconds.
    pub fn seconds_for(&self, phase: Phase) -> u32 {
        self.minutes_for(phase).saturating_mul(60)
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

fn check_range(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_25_and_5() {
        let s = TimerSettings::default();
        assert_eq!(s.seconds_for(Phase::Focus), 1500);
        assert_eq!(s.seconds_for(Phase::Break), 300);
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(TimerSettings::new(0, 5).is_err());
        assert!(TimerSettings::new(61, 5).is_err());
        assert!(TimerSettings::new(25, 0).is_err());
        assert!(TimerSettings::new(25, 31).is_err());
        assert!(TimerSettings::new(60, 30).is_ok());
        assert!(TimerSettings::new(1, 1).is_ok());
    }

    #[test]
    fn clamped_pulls_to_bounds() {
        let s = TimerSettings::clamped(0, 99);
        assert_eq!(s.focus_minutes, 1);
        assert_eq!(s.break_minutes, 30);
    }

    #[test]
    fn phase_alternates() {
        assert_eq!(Phase::Focus.next(), Phase::Break);
        assert_eq!(Phase::Break.next(), Phase::Focus);
        assert_eq!(Phase::parse(Phase::Break.as_str()), Some(Phase::Break));
    }
}
