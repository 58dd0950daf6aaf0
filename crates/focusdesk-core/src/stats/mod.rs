//! Statistics derived from completed focus phases.
//!
//! - [`DailyGoal`]: per-day target and achieved counter
//! - [`ProductivityStats`]: running totals, daily average and streaks
//!
//! Both are append-only aggregates: resetting the timer never touches them.

pub mod goal;
pub mod productivity;

pub use goal::{DailyGoal, DEFAULT_DAILY_TARGET};
pub use productivity::{
    credit_focus_completion, focus_hours, recompute_daily_average, ProductivityStats,
    DEFAULT_AVERAGE_WINDOW_DAYS,
};
