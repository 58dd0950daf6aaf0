use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAILY_TARGET: u32 = 8;

/// Per-day target/achieved counter of completed focus phases.
///
/// Identified by `user_id + date`; one record accumulates per day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
    pub date: NaiveDate,
    pub target: u32,
    pub achieved: u32,
    /// Phase serial of the last focus completion counted here.
    #[serde(default)]
    pub last_credited_serial: Option<u64>,
}

impl DailyGoal {
    pub fn new(date: NaiveDate, target: u32) -> Self {
        Self {
            date,
            target,
            achieved: 0,
            last_credited_serial: None,
        }
    }

    /// Count one completed focus phase. Returns false if `serial` was
    /// already counted.
    pub fn credit(&mut self, serial: u64) -> bool {
        if self.last_credited_serial.is_some_and(|last| last >= serial) {
            return false;
        }
        self.achieved = self.achieved.saturating_add(1);
        self.last_credited_serial = Some(serial);
        true
    }

    /// 0.0 .. 100.0, capped once the target is met.
    pub fn progress_pct(&self) -> f64 {
        if self.target == 0 {
            return 100.0;
        }
        (self.achieved as f64 / self.target as f64 * 100.0).min(100.0)
    }

    pub fn is_met(&self) -> bool {
        self.achieved >= self.target
    }
}
