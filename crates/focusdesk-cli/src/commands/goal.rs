use clap::Subcommand;
use focusdesk_core::DailyGoal;
use serde_json::json;

use super::{commit_and_print, print_json, today, CliResult, Context};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Today's target and progress
    Show,
    /// Set today's target
    Target {
        /// Focus phases to complete today
        target: u32,
    },
}

fn goal_json(goal: &DailyGoal) -> serde_json::Value {
    json!({
        "date": goal.date,
        "target": goal.target,
        "achieved": goal.achieved,
        "progress_pct": goal.progress_pct(),
        "met": goal.is_met(),
    })
}

pub fn run(ctx: &Context, action: GoalAction) -> CliResult {
    let db = ctx.open_db()?;
    let (mut tracker, _) = ctx.load_tracker(&db)?;

    match action {
        GoalAction::Show => {}
        GoalAction::Target { target } => {
            commit_and_print(&db, tracker.set_daily_target(target, today())?)?;
        }
    }
    print_json(&goal_json(tracker.goal()))
}
