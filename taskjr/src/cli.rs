//! Command-line front end: subcommands and their plain-text output.
//!
//! [`execute`] runs one command against a [`TaskStore`] and returns what to
//! print, so the binary only has to wire up config, logging and the backend.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use thiserror::Error;

use taskjr_proto::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
use taskjr_proto::view::{StatusFilter, ViewMode};

use crate::backend::Backend;
use crate::config::{CliArgs, ClientConfig};
use crate::store::{StoreError, TaskStore};
use crate::views::format::{format_due, format_relative};
use crate::views::kanban::KanbanBoard;
use crate::views::timeline::timeline;

/// Top-level parser for the `taskjr` binary.
#[derive(Parser, Debug)]
#[command(version, about = "Personal task board with optimistic sync")]
pub struct Cli {
    #[command(flatten)]
    pub args: CliArgs,

    /// Defaults to the configured view.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// One `taskjr` subcommand.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the signed-in user.
    Whoami,
    /// List tasks.
    List {
        /// Only tasks with this status (all, todo, in_progress, done).
        #[arg(long)]
        filter: Option<StatusFilter>,
        /// Case-insensitive text to look for in title or description.
        #[arg(long)]
        search: Option<String>,
    },
    /// Show tasks in status columns.
    Board {
        /// Only tasks with this status.
        #[arg(long)]
        filter: Option<StatusFilter>,
        /// Case-insensitive text to look for in title or description.
        #[arg(long)]
        search: Option<String>,
    },
    /// Show tasks grouped by due date.
    Timeline {
        /// Only tasks with this status.
        #[arg(long)]
        filter: Option<StatusFilter>,
        /// Case-insensitive text to look for in title or description.
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a task.
    Add {
        /// Task title.
        #[arg(long)]
        title: String,
        /// Free-form notes.
        #[arg(long)]
        description: Option<String>,
        /// low, medium or high.
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Starting column.
        #[arg(long, default_value = "todo")]
        status: TaskStatus,
        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Change fields of a task.
    Update {
        /// Id of the task to change.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New notes.
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the notes.
        #[arg(long)]
        clear_description: bool,
        /// New priority.
        #[arg(long)]
        priority: Option<Priority>,
        /// New status.
        #[arg(long)]
        status: Option<TaskStatus>,
        /// New due date as YYYY-MM-DD.
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        /// Remove the due date.
        #[arg(long)]
        clear_due: bool,
    },
    /// Move a task to another status column.
    Move {
        /// Id of the task to move.
        id: String,
        /// Target column.
        status: TaskStatus,
    },
    /// Delete a task.
    Delete {
        /// Id of the task to delete.
        id: String,
    },
}

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// The backend reports no session.
    #[error("not signed in; set an access token with --access-token or TASKJR_TOKEN")]
    NotSignedIn,
    /// The id is not in the loaded collection.
    #[error("no task with id {0}")]
    UnknownTask(TaskId),
    /// `update` was given no fields.
    #[error("nothing to update; pass at least one field")]
    EmptyUpdate,
    /// The store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs `command` and returns the text to print.
///
/// `None` shows the configured default view. Every command checks the
/// session first; all but `whoami` load the collection before acting.
///
/// # Errors
///
/// Returns [`CliError`] if there is no session, the target task does not
/// exist, or the store operation fails.
pub async fn execute<B: Backend>(
    store: &TaskStore<B>,
    command: Option<&Command>,
    config: &ClientConfig,
    now: DateTime<Utc>,
) -> Result<String, CliError> {
    let Some(user) = store.check_session().await? else {
        return Err(CliError::NotSignedIn);
    };
    tracing::info!(user_id = %user.id, backend = %store.backend().backend_type(), "session active");

    let command = command.cloned().unwrap_or_else(|| default_command(config));
    let today = now.date_naive();
    match command {
        Command::Whoami => Ok(match &user.email {
            Some(email) => format!("{email} ({})\n", user.id),
            None => format!("{}\n", user.id),
        }),
        Command::List { filter, search } => {
            load(store, config).await?;
            apply_selection(store, ViewMode::List, filter, search);
            Ok(render_list(&store.visible_tasks(), today))
        }
        Command::Board { filter, search } => {
            load(store, config).await?;
            apply_selection(store, ViewMode::Kanban, filter, search);
            Ok(render_board(&KanbanBoard::from_tasks(&store.visible_tasks())))
        }
        Command::Timeline { filter, search } => {
            load(store, config).await?;
            apply_selection(store, ViewMode::Timeline, filter, search);
            Ok(render_timeline(&store.visible_tasks(), today))
        }
        Command::Add {
            title,
            description,
            priority,
            status,
            due,
        } => {
            load(store, config).await?;
            let mut fields = NewTask::new(title)
                .with_priority(priority)
                .with_status(status);
            if let Some(description) = description {
                fields = fields.with_description(description);
            }
            if let Some(due) = due {
                fields = fields.with_due_date(due);
            }
            let task = store.add_task(fields).await?;
            Ok(format!("Created {}\n{}", task.id, render_task(&task, today, now)))
        }
        Command::Update {
            id,
            title,
            description,
            clear_description,
            priority,
            status,
            due,
            clear_due,
        } => {
            load(store, config).await?;
            let id = known_task(store, &id)?;
            let mut patch = TaskPatch::new();
            patch.title = title;
            patch.priority = priority;
            patch.status = status;
            if clear_description {
                patch.description = Some(None);
            } else if description.is_some() {
                patch.description = Some(description);
            }
            if clear_due {
                patch.due_date = Some(None);
            } else if due.is_some() {
                patch.due_date = Some(due);
            }
            if patch.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            store.update_task(&id, patch).await?;
            let task = store.task(&id).ok_or(CliError::UnknownTask(id))?;
            Ok(format!("Updated {}\n{}", task.id, render_task(&task, today, now)))
        }
        Command::Move { id, status } => {
            load(store, config).await?;
            let id = known_task(store, &id)?;
            if store.move_task(&id, status).await? {
                Ok(format!("Moved {id} to {}\n", status.label()))
            } else {
                Ok(format!("{id} is already in {}\n", status.label()))
            }
        }
        Command::Delete { id } => {
            load(store, config).await?;
            let id = known_task(store, &id)?;
            store.delete_task(&id).await?;
            Ok(format!("Deleted {id}\n"))
        }
    }
}

fn default_command(config: &ClientConfig) -> Command {
    match config.default_view {
        ViewMode::List => Command::List {
            filter: None,
            search: None,
        },
        ViewMode::Kanban => Command::Board {
            filter: None,
            search: None,
        },
        ViewMode::Timeline => Command::Timeline {
            filter: None,
            search: None,
        },
    }
}

async fn load<B: Backend>(store: &TaskStore<B>, config: &ClientConfig) -> Result<(), StoreError> {
    store.fetch_tasks().await?;
    store.set_filter(config.default_filter);
    Ok(())
}

fn apply_selection<B: Backend>(
    store: &TaskStore<B>,
    view: ViewMode,
    filter: Option<StatusFilter>,
    search: Option<String>,
) {
    store.set_view(view);
    if let Some(filter) = filter {
        store.set_filter(filter);
    }
    if let Some(search) = search {
        store.set_search_query(search);
    }
}

fn known_task<B: Backend>(store: &TaskStore<B>, id: &str) -> Result<TaskId, CliError> {
    let id = TaskId::new(id);
    if store.task(&id).is_none() {
        return Err(CliError::UnknownTask(id));
    }
    Ok(id)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// One line per task: id, status, priority, title and due date.
#[must_use]
pub fn render_list(tasks: &[Task], today: NaiveDate) -> String {
    if tasks.is_empty() {
        return "No tasks found\n".to_string();
    }
    let mut out = String::new();
    for task in tasks {
        let _ = write!(
            out,
            "{}  {:<11} {:<6} {}",
            task.id,
            task.status.label(),
            task.priority.as_str(),
            task.title
        );
        if let Some(due) = task.due_date {
            let _ = write!(out, "  (due {})", format_due(due, today));
        }
        out.push('\n');
    }
    out
}

/// Three sections, one per status column.
#[must_use]
pub fn render_board(board: &KanbanBoard) -> String {
    let mut out = String::new();
    for (status, tasks) in board.columns() {
        let _ = writeln!(out, "{} ({})", status.label(), tasks.len());
        for task in tasks {
            let _ = writeln!(out, "  - {} [{}] {}", task.id, task.priority, task.title);
        }
    }
    out
}

/// Tasks under relative due-date headings.
#[must_use]
pub fn render_timeline(tasks: &[Task], today: NaiveDate) -> String {
    let groups = timeline(tasks, today);
    if groups.is_empty() {
        return "No tasks found\n".to_string();
    }
    let mut out = String::new();
    for group in groups {
        let noun = if group.tasks.len() == 1 { "task" } else { "tasks" };
        let _ = writeln!(out, "{} ({} {noun})", group.label, group.tasks.len());
        for task in &group.tasks {
            let _ = writeln!(
                out,
                "  - {} [{}] {} ({})",
                task.id,
                task.status.label(),
                task.title,
                task.priority
            );
        }
    }
    out
}

fn render_task(task: &Task, today: NaiveDate, now: DateTime<Utc>) -> String {
    let mut out = format!(
        "  {}\n  status: {}  priority: {}\n",
        task.title,
        task.status.label(),
        task.priority
    );
    if let Some(description) = &task.description {
        let _ = writeln!(out, "  {description}");
    }
    if let Some(due) = task.due_date {
        let _ = writeln!(out, "  due: {}", format_due(due, today));
    }
    let _ = writeln!(out, "  updated {}", format_relative(task.updated_at, now));
    out
}
