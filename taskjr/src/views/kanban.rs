//! Kanban projection: one column per status.

use taskjr_proto::task::{Task, TaskPatch, TaskStatus};

/// Visible tasks split into status columns, store order kept within each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KanbanBoard {
    /// "To Do" column.
    pub todo: Vec<Task>,
    /// "In Progress" column.
    pub in_progress: Vec<Task>,
    /// "Done" column.
    pub done: Vec<Task>,
}

impl KanbanBoard {
    /// Splits `tasks` into columns.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut board = Self::default();
        for task in tasks {
            board.column_mut(task.status).push(task.clone());
        }
        board
    }

    /// The column holding tasks with `status`.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.todo,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Done => &self.done,
        }
    }

    fn column_mut(&mut self, status: TaskStatus) -> &mut Vec<Task> {
        match status {
            TaskStatus::Todo => &mut self.todo,
            TaskStatus::InProgress => &mut self.in_progress,
            TaskStatus::Done => &mut self.done,
        }
    }

    /// Columns in display order with their status.
    pub fn columns(&self) -> impl Iterator<Item = (TaskStatus, &[Task])> {
        TaskStatus::ALL.into_iter().map(|s| (s, self.column(s)))
    }

    /// Total number of cards on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.todo.len() + self.in_progress.len() + self.done.len()
    }

    /// True when every column is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The update to issue when `task` is dropped on the `column` column.
///
/// Dropping a card back onto its own column is not a change.
#[must_use]
pub fn drop_target(task: &Task, column: TaskStatus) -> Option<TaskPatch> {
    (task.status != column).then(|| TaskPatch::status(column))
}
