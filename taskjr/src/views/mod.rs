//! Read-only projections of the task collection.
//!
//! Every view starts from [`visible_tasks`] (status filter plus search
//! query) and only reshapes it; none of them mutate the store.

pub mod format;
pub mod kanban;
pub mod timeline;

use taskjr_proto::task::Task;
use taskjr_proto::view::StatusFilter;

/// Returns `true` if `task` passes both the status filter and the search
/// query.
///
/// The query matches case-insensitively against the title and the
/// description. An empty query matches everything.
#[must_use]
pub fn matches(task: &Task, filter: StatusFilter, query: &str) -> bool {
    if !filter.admits(task.status) {
        return false;
    }
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// Tasks passing [`matches`], in their original order.
#[must_use]
pub fn visible_tasks(tasks: &[Task], filter: StatusFilter, query: &str) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| matches(t, filter, query))
        .cloned()
        .collect()
}
