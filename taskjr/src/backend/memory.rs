//! In-memory backend for testing.
//!
//! [`MemoryBackend`] keeps rows in a `Vec` behind a mutex and behaves like
//! the hosted backend: rows are scoped to the signed-in user, ids and
//! timestamps are assigned on insert, and listing is newest first. Tests can
//! script failures and per-call latency to drive the store's rollback paths.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use taskjr_proto::auth::User;
use taskjr_proto::task::{NewTask, Task, TaskId, TaskPatch};

use super::{Backend, BackendError, BackendType};

/// A backend call, used for failure scripting and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Backend::current_user`].
    CurrentUser,
    /// [`Backend::list_tasks`].
    List,
    /// [`Backend::insert_task`].
    Insert,
    /// [`Backend::update_task`].
    Update,
    /// [`Backend::delete_task`].
    Delete,
}

/// Scripted behavior for upcoming calls.
#[derive(Debug, Default)]
struct Script {
    fail_next: HashMap<Operation, VecDeque<String>>,
    fail_always: HashMap<Operation, String>,
    delay_next: HashMap<Operation, VecDeque<Duration>>,
}

impl Script {
    /// Pops the decision for one call: an optional failure and a delay.
    fn take(&mut self, op: Operation) -> (Option<String>, Duration) {
        let failure = self
            .fail_next
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.fail_always.get(&op).cloned());
        let delay = self
            .delay_next
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        (failure, delay)
    }
}

/// In-process [`Backend`] with scripted failures.
pub struct MemoryBackend {
    /// Signed-in user, or `None` for a signed-out session.
    user: Option<User>,
    /// All rows, newest first.
    rows: Mutex<Vec<Task>>,
    /// Last timestamp handed out, to keep server time strictly increasing.
    clock: Mutex<DateTime<Utc>>,
    script: Mutex<Script>,
    calls: Mutex<Vec<Operation>>,
}

impl MemoryBackend {
    /// Creates an empty backend with `user` signed in.
    #[must_use]
    pub fn new(user: User) -> Self {
        Self::with_session(Some(user))
    }

    /// Creates an empty backend with no session.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::with_session(None)
    }

    fn with_session(user: Option<User>) -> Self {
        Self {
            user,
            rows: Mutex::new(Vec::new()),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Seeds rows as if they had been inserted earlier.
    ///
    /// Rows are kept newest first regardless of the order given.
    #[must_use]
    pub fn with_tasks(self, tasks: Vec<Task>) -> Self {
        {
            let mut rows = self.rows.lock();
            rows.extend(tasks);
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        self
    }

    /// Makes the next call to `op` fail with `message`.
    ///
    /// Calls queue up: two `fail_next` for the same operation fail the next
    /// two calls.
    pub fn fail_next(&self, op: Operation, message: impl Into<String>) {
        self.script
            .lock()
            .fail_next
            .entry(op)
            .or_default()
            .push_back(message.into());
    }

    /// Makes every call to `op` fail with `message` until cleared.
    pub fn fail_always(&self, op: Operation, message: impl Into<String>) {
        self.script.lock().fail_always.insert(op, message.into());
    }

    /// Delays the next call to `op` by `delay` before it resolves.
    pub fn delay_next(&self, op: Operation, delay: Duration) {
        self.script
            .lock()
            .delay_next
            .entry(op)
            .or_default()
            .push_back(delay);
    }

    /// Removes all scripted failures and delays.
    pub fn clear_script(&self) {
        *self.script.lock() = Script::default();
    }

    /// Returns the signed-in user's rows, newest first.
    #[must_use]
    pub fn rows(&self) -> Vec<Task> {
        let Some(user) = &self.user else {
            return Vec::new();
        };
        self.rows
            .lock()
            .iter()
            .filter(|t| t.owner_id == user.id)
            .cloned()
            .collect()
    }

    /// Returns every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().clone()
    }

    /// Records the call and applies its scripted delay and failure.
    async fn begin(&self, op: Operation) -> Result<(), BackendError> {
        self.calls.lock().push(op);
        let (failure, delay) = self.script.lock().take(op);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(message) => Err(BackendError::Injected(message)),
            None => Ok(()),
        }
    }

    fn session(&self) -> Result<&User, BackendError> {
        self.user.as_ref().ok_or(BackendError::Unauthorized)
    }

    /// Returns a timestamp strictly later than any handed out before.
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.clock.lock();
        let next = Utc::now().max(*last + TimeDelta::microseconds(1));
        *last = next;
        next
    }
}

impl Backend for MemoryBackend {
    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        self.begin(Operation::CurrentUser).await?;
        Ok(self.user.clone())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError> {
        self.begin(Operation::List).await?;
        self.session()?;
        Ok(self.rows())
    }

    async fn insert_task(&self, fields: &NewTask) -> Result<Task, BackendError> {
        self.begin(Operation::Insert).await?;
        let owner = self.session()?.id.clone();
        let now = self.now();
        let task = Task {
            id: TaskId::new(Uuid::new_v4().to_string()),
            owner_id: owner,
            title: fields.title.clone(),
            description: fields.description.clone(),
            status: fields.status,
            priority: fields.priority,
            due_date: fields.due_date,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().insert(0, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), BackendError> {
        self.begin(Operation::Update).await?;
        let owner = self.session()?.id.clone();
        let now = self.now();
        let mut rows = self.rows.lock();
        let task = rows
            .iter_mut()
            .find(|t| t.id == *id && t.owner_id == owner)
            .ok_or_else(|| BackendError::NotFound(id.clone()))?;
        patch.apply(task);
        task.updated_at = now.max(task.updated_at);
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), BackendError> {
        self.begin(Operation::Delete).await?;
        let owner = self.session()?.id.clone();
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|t| !(t.id == *id && t.owner_id == owner));
        if rows.len() == before {
            return Err(BackendError::NotFound(id.clone()));
        }
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }
}
