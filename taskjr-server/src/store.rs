//! In-memory task table.
//!
//! The [`TaskTable`] holds every user's rows in one `Vec`, newest first, and
//! scopes every operation to an owner id the way row-level security does on
//! the hosted service.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use taskjr_proto::task::{NewTask, Task, TaskId, TaskPatch};

/// Thread-safe table of task rows.
pub struct TaskTable {
    rows: RwLock<Vec<Task>>,
    clock: Mutex<DateTime<Utc>>,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Timestamp strictly later than any handed out before.
    async fn now(&self) -> DateTime<Utc> {
        let mut last = self.clock.lock().await;
        let next = Utc::now().max(*last + TimeDelta::microseconds(1));
        *last = next;
        next
    }

    /// Rows owned by `owner`, newest first.
    pub async fn list(&self, owner: &str) -> Vec<Task> {
        let rows = self.rows.read().await;
        rows.iter().filter(|t| t.owner_id == owner).cloned().collect()
    }

    /// Inserts a row for `owner` with a fresh id and server timestamps.
    pub async fn insert(&self, owner: &str, fields: NewTask) -> Task {
        let now = self.now().await;
        let task = Task {
            id: TaskId::new(Uuid::new_v4().to_string()),
            owner_id: owner.to_string(),
            title: fields.title,
            description: fields.description,
            status: fields.status,
            priority: fields.priority,
            due_date: fields.due_date,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.insert(0, task.clone());
        tracing::debug!(task_id = %task.id, owner = %owner, "row inserted");
        task
    }

    /// Applies `patch` to `owner`'s row `id`; `updated_at` never goes back.
    ///
    /// Returns the updated row, or `None` if `owner` has no such row.
    pub async fn update(&self, owner: &str, id: &TaskId, patch: &TaskPatch) -> Option<Task> {
        let now = self.now().await;
        let mut rows = self.rows.write().await;
        let task = rows
            .iter_mut()
            .find(|t| t.id == *id && t.owner_id == owner)?;
        patch.apply(task);
        task.updated_at = now.max(task.updated_at);
        Some(task.clone())
    }

    /// Deletes `owner`'s row `id`. Returns `false` if there was none.
    pub async fn delete(&self, owner: &str, id: &TaskId) -> bool {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|t| !(t.id == *id && t.owner_id == owner));
        rows.len() != before
    }

    /// Total rows across all owners.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` if the table holds no rows at all.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}
