use clap::Subcommand;
use focusdesk_core::TimerSettings;

use super::{commit_and_print, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current durations
    Show,
    /// Set focus and break minutes
    Set {
        /// Focus minutes (1-60)
        focus: u32,
        /// Break minutes (1-30)
        #[arg(value_name = "BREAK")]
        break_minutes: u32,
        /// Clamp out-of-range values instead of rejecting them
        #[arg(long)]
        clamp: bool,
    },
}

pub fn run(ctx: &Context, action: SettingsAction) -> CliResult {
    let db = ctx.open_db()?;
    let (mut tracker, _) = ctx.load_tracker(&db)?;

    match action {
        SettingsAction::Show => {}
        SettingsAction::Set {
            focus,
            break_minutes,
            clamp,
        } => {
            let (focus, break_minutes) = if clamp {
                let s = TimerSettings::clamped(focus, break_minutes);
                (s.focus_minutes, s.break_minutes)
            } else {
                (focus, break_minutes)
            };
            commit_and_print(&db, tracker.apply_settings(focus, break_minutes)?)?;
        }
    }
    print_json(tracker.clock().settings())
}
