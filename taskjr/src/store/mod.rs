//! Optimistic task store.
//!
//! [`TaskStore`] is the single source of truth for the task collection and
//! the client-side filter/search/view state. Every mutation follows the same
//! protocol:
//!
//! 1. Snapshot what may need restoring and apply the change locally.
//! 2. Issue one backend request (the only suspension point).
//! 3. On success keep or reconcile the local state; on failure restore the
//!    snapshot and record the error message.
//!
//! The state lives behind a synchronous mutex that is never held across an
//! `.await`, so readers always observe the latest committed state and
//! concurrent operations on different tasks keep independent snapshots.
//! Concurrent operations on the *same* task are not ordered unless
//! [`StoreOptions::serialize_per_task`] is set.

pub mod state;

pub use state::StoreState;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use taskjr_proto::auth::User;
use taskjr_proto::task::{
    MAX_TASK_TITLE_LENGTH, NewTask, Task, TaskError, TaskId, TaskPatch, TaskStatus,
    validate_title_with_limit,
};
use taskjr_proto::view::{StatusFilter, ViewMode};

use crate::backend::{Backend, BackendError};
use crate::views::kanban;

/// Errors returned by store operations.
///
/// The same message is recorded in [`StoreState::error`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input was rejected before any local change was made.
    #[error(transparent)]
    Invalid(#[from] TaskError),
    /// The backend call failed; local state was rolled back.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Tuning knobs for [`TaskStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Run updates and deletes on the same task id one at a time.
    ///
    /// Off by default: a failed update can then roll back over a newer
    /// optimistic change to the same task (last resolver wins).
    pub serialize_per_task: bool,
    /// Maximum title length in characters.
    pub max_title_len: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            serialize_per_task: false,
            max_title_len: MAX_TASK_TITLE_LENGTH,
        }
    }
}

/// Per-id async locks used when [`StoreOptions::serialize_per_task`] is set.
#[derive(Default)]
struct TaskLocks {
    locks: Mutex<HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>>,
}

impl TaskLocks {
    async fn acquire(&self, id: &TaskId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            // Entries nobody holds or waits on are dead weight.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Shared task collection with optimistic mutations over a [`Backend`].
///
/// Share it by reference (typically `Arc<TaskStore<B>>`); all methods take
/// `&self`.
pub struct TaskStore<B> {
    backend: B,
    state: Mutex<StoreState>,
    options: StoreOptions,
    locks: TaskLocks,
}

impl<B: Backend> TaskStore<B> {
    /// Creates an empty store with default options.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    /// Creates an empty store with the given options.
    pub fn with_options(backend: B, options: StoreOptions) -> Self {
        Self {
            backend,
            state: Mutex::new(StoreState::default()),
            options,
            locks: TaskLocks::default(),
        }
    }

    /// Returns the backend this store persists through.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the options this store was built with.
    pub const fn options(&self) -> &StoreOptions {
        &self.options
    }

    // -- Readers ------------------------------------------------------------

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.state.lock().clone()
    }

    /// Runs `f` against the current state without cloning it.
    ///
    /// `f` must not call back into the store.
    pub fn with_state<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.state.lock())
    }

    /// Returns a copy of the task collection, newest first.
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// Returns a copy of the task with the given id.
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state.lock().task(id).cloned()
    }

    /// Tasks passing the active filter and search query.
    pub fn visible_tasks(&self) -> Vec<Task> {
        self.state.lock().visible_tasks()
    }

    /// Message of the most recent failure.
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// `true` while a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    // -- Setters ------------------------------------------------------------

    /// Sets the status filter.
    pub fn set_filter(&self, filter: StatusFilter) {
        self.state.lock().filter = filter;
    }

    /// Sets the search query.
    pub fn set_search_query(&self, query: impl Into<String>) {
        self.state.lock().search_query = query.into();
    }

    /// Sets the active view.
    pub fn set_view(&self, view: ViewMode) {
        self.state.lock().view = view;
    }

    /// Dismisses the recorded error.
    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    // -- Backend operations ---------------------------------------------------

    /// Asks the backend who is signed in.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the session check itself fails.
    pub async fn check_session(&self) -> Result<Option<User>, StoreError> {
        match self.backend.current_user().await {
            Ok(user) => {
                tracing::debug!(signed_in = user.is_some(), "session checked");
                Ok(user)
            }
            Err(e) => Err(self.record(e.into())),
        }
    }

    /// Replaces the collection with the backend's, newest first.
    ///
    /// Clears any recorded error first. On failure the collection is left
    /// as it was.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the list request fails.
    pub async fn fetch_tasks(&self) -> Result<(), StoreError> {
        {
            let mut state = self.state.lock();
            state.is_loading = true;
            state.error = None;
        }

        let result = self.backend.list_tasks().await;

        let mut state = self.state.lock();
        state.is_loading = false;
        match result {
            Ok(tasks) => {
                tracing::info!(count = tasks.len(), "fetched tasks");
                state.tasks = tasks;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "fetch failed");
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Creates a task.
    ///
    /// A placeholder with a temporary id is prepended immediately. When the
    /// backend confirms, the placeholder (found by its temporary id) is
    /// replaced with the confirmed row, which is returned. On failure the
    /// placeholder is removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for a bad title (nothing is inserted)
    /// or [`StoreError::Backend`] if the insert fails.
    pub async fn add_task(&self, fields: NewTask) -> Result<Task, StoreError> {
        if let Err(e) = validate_title_with_limit(&fields.title, self.options.max_title_len) {
            return Err(self.record(e.into()));
        }

        let placeholder = Task::placeholder(&fields, Utc::now());
        let temp_id = placeholder.id.clone();
        self.state.lock().tasks.insert(0, placeholder);
        tracing::debug!(temp_id = %temp_id, "inserted placeholder");

        match self.backend.insert_task(&fields).await {
            Ok(confirmed) => {
                tracing::debug!(temp_id = %temp_id, task_id = %confirmed.id, "insert confirmed");
                self.state.lock().replace(&temp_id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => {
                tracing::warn!(temp_id = %temp_id, error = %e, "insert failed, removing placeholder");
                let mut state = self.state.lock();
                state.remove(&temp_id);
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Applies a partial update to a task.
    ///
    /// An unknown id is a no-op: nothing changes, no request is made and no
    /// error is recorded. Otherwise the patch is applied immediately with
    /// `updated_at` advanced; if the backend rejects it the task is restored
    /// to exactly its pre-update value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] if the patch carries a bad title, or
    /// [`StoreError::Backend`] if the update fails.
    pub async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        let _serial = self.serialize(id).await;

        let original = {
            let mut state = self.state.lock();
            if state.task(id).is_none() {
                tracing::debug!(task_id = %id, "update of unknown task ignored");
                return Ok(());
            }
            if let Some(title) = &patch.title
                && let Err(e) = validate_title_with_limit(title, self.options.max_title_len)
            {
                let err = StoreError::from(e);
                state.error = Some(err.to_string());
                return Err(err);
            }
            let Some(task) = state.task_mut(id) else {
                return Ok(());
            };
            let original = task.clone();
            patch.apply(task);
            task.updated_at = Utc::now().max(original.updated_at);
            original
        };
        tracing::debug!(task_id = %id, "applied optimistic update");

        if let Err(e) = self.backend.update_task(id, &patch).await {
            tracing::warn!(task_id = %id, error = %e, "update failed, restoring task");
            let mut state = self.state.lock();
            state.replace(id, original);
            state.error = Some(e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    /// Moves a task to another status column.
    ///
    /// Returns `Ok(false)` without issuing a request if the task is unknown
    /// or already has that status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the resulting update fails.
    pub async fn move_task(&self, id: &TaskId, status: TaskStatus) -> Result<bool, StoreError> {
        let Some(patch) = self.with_state(|s| s.task(id).and_then(|t| kanban::drop_target(t, status)))
        else {
            return Ok(false);
        };
        self.update_task(id, patch).await?;
        Ok(true)
    }

    /// Deletes a task.
    ///
    /// The task disappears immediately. If the backend rejects the delete,
    /// the whole collection is restored to its pre-delete value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the delete fails.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let _serial = self.serialize(id).await;

        let snapshot = {
            let mut state = self.state.lock();
            let snapshot = state.tasks.clone();
            state.remove(id);
            snapshot
        };
        tracing::debug!(task_id = %id, "applied optimistic delete");

        if let Err(e) = self.backend.delete_task(id).await {
            tracing::warn!(task_id = %id, error = %e, "delete failed, restoring collection");
            let mut state = self.state.lock();
            state.tasks = snapshot;
            state.error = Some(e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    // -- Internal helpers -----------------------------------------------------

    /// Records an error message in state and hands the error back.
    fn record(&self, err: StoreError) -> StoreError {
        self.state.lock().error = Some(err.to_string());
        err
    }

    async fn serialize(&self, id: &TaskId) -> Option<OwnedMutexGuard<()>> {
        if self.options.serialize_per_task {
            Some(self.locks.acquire(id).await)
        } else {
            None
        }
    }
}
