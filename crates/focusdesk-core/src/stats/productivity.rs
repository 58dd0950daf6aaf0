use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::goal::DailyGoal;

pub const DEFAULT_AVERAGE_WINDOW_DAYS: u32 = 30;

/// Running per-user aggregate over all completed focus phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProductivityStats {
    pub total_completed_phases: u64,
    pub total_focus_minutes: u64,
    pub longest_streak_days: u32,
    /// Derived; see [`recompute_daily_average`].
    pub daily_average_minutes: u64,
    #[serde(default)]
    pub current_streak_days: u32,
    #[serde(default)]
    pub last_focus_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_credited_serial: Option<u64>,
}

/// `round(total_completed_phases * focus_minutes / window_days)`.
///
/// The divisor is a fixed window, not the account age.
pub fn recompute_daily_average(total_completed_phases: u64, focus_minutes: u32, window_days: u32) -> u64 {
    if window_days == 0 {
        return 0;
    }
    let minutes = total_completed_phases as f64 * focus_minutes as f64;
    (minutes / window_days as f64).round() as u64
}

/// Whole hours of focus, rounded.
pub fn focus_hours(total_focus_minutes: u64) -> u64 {
    (total_focus_minutes as f64 / 60.0).round() as u64
}

impl ProductivityStats {
    /// Fold one focus completion into the totals. Returns false if
    /// `serial` was already counted.
    pub fn credit(&mut self, serial: u64, focus_minutes: u32, on: NaiveDate, window_days: u32) -> bool {
        if self.has_credited(serial) {
            return false;
        }
        self.total_completed_phases = self.total_completed_phases.saturating_add(1);
        self.total_focus_minutes = self.total_focus_minutes.saturating_add(focus_minutes as u64);
        self.daily_average_minutes =
            recompute_daily_average(self.total_completed_phases, focus_minutes, window_days);
        self.advance_streak(on);
        self.last_credited_serial = Some(serial);
        true
    }

    pub fn has_credited(&self, serial: u64) -> bool {
        self.last_credited_serial.is_some_and(|last| last >= serial)
    }

    fn advance_streak(&mut self, on: NaiveDate) {
        self.current_streak_days = match self.last_focus_date {
            Some(last) if last == on => self.current_streak_days.max(1),
            Some(last) if last.succ_opt() == Some(on) => self.current_streak_days.saturating_add(1),
            _ => 1,
        };
        self.last_focus_date = Some(on);
        self.longest_streak_days = self.longest_streak_days.max(self.current_streak_days);
    }
}

/// Credit a finished focus phase to today's goal and the running stats.
///
/// Returns `(goal_changed, stats_changed)`. The stats serial spans days, so a
/// serial it has already counted leaves both untouched even when `goal` is a
/// different day's record.
pub fn credit_focus_completion(
    goal: &mut DailyGoal,
    stats: &mut ProductivityStats,
    serial: u64,
    focus_minutes: u32,
    window_days: u32,
) -> (bool, bool) {
    if stats.has_credited(serial) {
        return (false, false);
    }
    let on = goal.date;
    let goal_changed = goal.credit(serial);
    let stats_changed = stats.credit(serial, focus_minutes, on, window_days);
    (goal_changed, stats_changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn daily_average_uses_fixed_window() {
        assert_eq!(recompute_daily_average(1, 25, 30), 1);
        assert_eq!(recompute_daily_average(12, 25, 30), 10);
        assert_eq!(recompute_daily_average(0, 25, 30), 0);
        assert_eq!(recompute_daily_average(5, 25, 0), 0);
    }

    #[test]
    fn focus_hours_rounds() {
        assert_eq!(focus_hours(89), 1);
        assert_eq!(focus_hours(90), 2);
    }

    #[test]
    fn credit_accumulates_totals() {
        let mut stats = ProductivityStats::default();
        assert!(stats.credit(0, 25, date(1), 30));
        assert!(stats.credit(2, 25, date(1), 30));
        assert_eq!(stats.total_completed_phases, 2);
        assert_eq!(stats.total_focus_minutes, 50);
        assert_eq!(stats.daily_average_minutes, 2);
    }

    #[test]
    fn credit_skips_seen_serial() {
        let mut stats = ProductivityStats::default();
        assert!(stats.credit(4, 25, date(1), 30));
        assert!(!stats.credit(4, 25, date(1), 30));
        assert!(!stats.credit(2, 25, date(1), 30));
        assert_eq!(stats.total_completed_phases, 1);
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let mut stats = ProductivityStats::default();
        stats.credit(0, 25, date(1), 30);
        stats.credit(2, 25, date(1), 30);
        assert_eq!(stats.current_streak_days, 1);
        stats.credit(4, 25, date(2), 30);
        stats.credit(6, 25, date(3), 30);
        assert_eq!(stats.current_streak_days, 3);
        assert_eq!(stats.longest_streak_days, 3);

        stats.credit(8, 25, date(7), 30);
        assert_eq!(stats.current_streak_days, 1);
        assert_eq!(stats.longest_streak_days, 3);
    }

    #[test]
    fn credit_focus_completion_updates_both() {
        let mut goal = DailyGoal::new(date(9), 8);
        let mut stats = ProductivityStats::default();
        assert_eq!(credit_focus_completion(&mut goal, &mut stats, 0, 25, 30), (true, true));
        assert_eq!(goal.achieved, 1);
        assert_eq!(stats.last_focus_date, Some(date(9)));
        assert_eq!(credit_focus_completion(&mut goal, &mut stats, 0, 25, 30), (false, false));
    }

    #[test]
    fn counted_serial_skips_another_days_goal() {
        let mut stats = ProductivityStats::default();
        let mut monday = DailyGoal::new(date(11), 8);
        credit_focus_completion(&mut monday, &mut stats, 3, 25, 30);

        let mut tuesday = DailyGoal::new(date(12), 8);
        assert_eq!(credit_focus_completion(&mut tuesday, &mut stats, 3, 25, 30), (false, false));
        assert_eq!(tuesday.achieved, 0);
        assert_eq!(stats.total_completed_phases, 1);
        assert_eq!(stats.last_focus_date, Some(date(11)));
    }
}
