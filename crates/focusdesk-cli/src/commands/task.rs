//! Task management commands for CLI.

use clap::Subcommand;
use focusdesk_core::{Task, TaskStatus, TaskStore};
use serde_json::json;

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task text
        text: String,
    },
    /// List tasks, newest first
    List,
    /// Mark a task completed
    Done {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Remove {
        /// Task ID
        id: String,
    },
}

pub fn run(ctx: &Context, action: TaskAction) -> CliResult {
    let db = ctx.open_db()?;

    match action {
        TaskAction::Add { text } => {
            let task = Task::new(&ctx.user_id, &text)?;
            db.insert_task(&task)?;
            print_json(&task)
        }
        TaskAction::List => print_json(&db.list_tasks(&ctx.user_id)?),
        TaskAction::Done { id } => {
            if !db.set_task_status(&ctx.user_id, &id, TaskStatus::Completed)? {
                return Err(format!("task not found: {id}").into());
            }
            print_json(&db.get_task(&id)?)
        }
        TaskAction::Remove { id } => {
            if !db.delete_task(&ctx.user_id, &id)? {
                return Err(format!("task not found: {id}").into());
            }
            print_json(&json!({ "deleted": id }))
        }
    }
}
