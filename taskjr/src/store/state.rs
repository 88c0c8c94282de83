//! Plain state held by the task store.

use taskjr_proto::task::{Task, TaskId};
use taskjr_proto::view::{StatusFilter, ViewMode};

use crate::views;

/// Everything the store holds: the task collection plus client-side
/// view state.
///
/// Readers get clones of this through
/// [`TaskStore::snapshot`](crate::store::TaskStore::snapshot); only the
/// store mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// Tasks, newest first by creation time.
    pub tasks: Vec<Task>,
    /// `true` while a fetch is in flight.
    pub is_loading: bool,
    /// Message of the most recent failure, until cleared.
    pub error: Option<String>,
    /// Active status filter.
    pub filter: StatusFilter,
    /// Free-text search query.
    pub search_query: String,
    /// Active projection.
    pub view: ViewMode,
}

impl StoreState {
    /// Returns the task with the given id.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == *id)
    }

    pub(crate) fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == *id)
    }

    /// Replaces the task with id `id` by `task`, keeping its position.
    ///
    /// Does nothing if no task has that id.
    pub(crate) fn replace(&mut self, id: &TaskId, task: Task) {
        if let Some(slot) = self.task_mut(id) {
            *slot = task;
        }
    }

    /// Removes the task with the given id, if present.
    pub(crate) fn remove(&mut self, id: &TaskId) {
        self.tasks.retain(|t| t.id != *id);
    }

    /// Tasks passing the active filter and search query, in store order.
    #[must_use]
    pub fn visible_tasks(&self) -> Vec<Task> {
        views::visible_tasks(&self.tasks, self.filter, &self.search_query)
    }
}
