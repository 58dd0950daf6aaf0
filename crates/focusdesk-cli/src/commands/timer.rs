use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use focusdesk_core::display::{alert_text, format_clock};
use focusdesk_core::{ClockDriver, Database, Event, FocusTracker, Phase, PhaseNotifier, TaskStore};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use super::{commit_and_print, print_json, today, CliResult, Context};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current phase
    Start,
    /// Pause the countdown
    Pause,
    /// Back to a full, idle focus phase
    Reset,
    /// End the current phase now
    Skip,
    /// Print current timer state as JSON
    Status,
    /// Advance a running timer by whole seconds
    Tick {
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Link a task to the focus session
    Link {
        /// Task ID
        task_id: String,
    },
    /// Remove the linked task
    Unlink,
    /// Run the countdown live until the phase ends (Ctrl-C pauses)
    Run,
}

fn status_json(tracker: &FocusTracker) -> Result<serde_json::Value, serde_json::Error> {
    let clock = tracker.clock();
    let mut value = serde_json::to_value(tracker.snapshot())?;
    value["clock"] = json!(format_clock(clock.seconds_remaining()));
    value["remaining_fraction"] = json!(clock.remaining_fraction());
    value["focus_minutes"] = json!(clock.settings().focus_minutes);
    value["break_minutes"] = json!(clock.settings().break_minutes);
    Ok(value)
}

pub fn run(ctx: &Context, action: TimerAction) -> CliResult {
    let db = ctx.open_db()?;
    let (mut tracker, caught_up) = ctx.load_tracker(&db)?;
    for event in &caught_up {
        print_json(event)?;
    }

    match action {
        TimerAction::Start => commit_and_print(&db, tracker.start())?,
        TimerAction::Pause => commit_and_print(&db, tracker.pause())?,
        TimerAction::Reset => commit_and_print(&db, tracker.reset())?,
        TimerAction::Skip => commit_and_print(&db, tracker.complete_phase(today()))?,
        TimerAction::Status => {}
        TimerAction::Tick { count } => commit_and_print(&db, tracker.tick_many(count, today()))?,
        TimerAction::Link { task_id } => {
            let owned = db
                .get_task(&task_id)?
                .is_some_and(|task| task.user_id == ctx.user_id);
            if !owned {
                return Err(format!("task not found: {task_id}").into());
            }
            commit_and_print(&db, tracker.link_task(Some(task_id))?)?;
        }
        TimerAction::Unlink => commit_and_print(&db, tracker.link_task(None)?)?,
        TimerAction::Run => return run_live(db, tracker),
    }

    print_json(&status_json(&tracker)?)
}

fn run_live(db: Database, tracker: FocusTracker) -> CliResult {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(drive(db, tracker))
}

async fn drive(db: Database, tracker: FocusTracker) -> CliResult {
    let notifier: Arc<dyn PhaseNotifier> = Arc::new(|previous: Phase, _credited: bool| {
        let (title, body) = alert_text(previous);
        eprintln!("\n{title} {body}");
    });
    let driver = ClockDriver::new(tracker, Arc::new(db), Some(notifier))?;
    let mut events = driver.subscribe();
    driver.start().await?;

    let mut display = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                break;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    print_json(&event)?;
                    if matches!(event, Event::PhaseCompleted { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = display.tick() => {
                if let Event::StateSnapshot { phase, seconds_remaining, .. } = driver.snapshot().await {
                    eprint!("\r{} {}", phase.as_str(), format_clock(seconds_remaining));
                }
            }
        }
    }

    driver.shutdown().await?;
    print_json(&driver.snapshot().await)
}
