use clap::Subcommand;
use focusdesk_core::stats::focus_hours;
use serde_json::json;

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum StatsAction {
    /// All-time productivity stats
    Show,
}

pub fn run(ctx: &Context, action: StatsAction) -> CliResult {
    let db = ctx.open_db()?;
    let (tracker, _) = ctx.load_tracker(&db)?;

    match action {
        StatsAction::Show => {
            let stats = tracker.stats();
            let goal = tracker.goal();
            print_json(&json!({
                "total_completed_phases": stats.total_completed_phases,
                "total_focus_minutes": stats.total_focus_minutes,
                "focus_hours": focus_hours(stats.total_focus_minutes),
                "daily_average_minutes": stats.daily_average_minutes,
                "current_streak_days": stats.current_streak_days,
                "longest_streak_days": stats.longest_streak_days,
                "today": {
                    "date": goal.date,
                    "achieved": goal.achieved,
                    "target": goal.target,
                    "progress_pct": goal.progress_pct(),
                },
            }))
        }
    }
}
