//! Remote backend abstraction for Taskjr.
//!
//! Defines the [`Backend`] trait the task store persists through.
//! Concrete implementations:
//! - [`memory::MemoryBackend`] — in-process fake with failure injection for testing
//! - [`rest::RestBackend`] — HTTP client for the hosted REST backend

pub mod memory;
pub mod rest;

use std::fmt;

use taskjr_proto::auth::User;
use taskjr_proto::task::{NewTask, Task, TaskId, TaskPatch};

/// Describes which kind of backend is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Hosted REST backend over HTTP.
    Rest,
    /// In-process memory backend for testing.
    Memory,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest => write!(f, "REST"),
            Self::Memory => write!(f, "Memory"),
        }
    }
}

/// Errors that can occur while talking to the backend.
///
/// The `Display` output is what the store records for the user to see.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the status reason.
        message: String,
    },

    /// There is no authenticated session, or it was rejected.
    #[error("not signed in")]
    Unauthorized,

    /// No task with the given id exists for the current user.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The request never produced a response (connect, TLS, timeout).
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("unexpected response from backend: {0}")]
    Decode(String),

    /// The backend could not be constructed from its configuration.
    #[error("invalid backend configuration: {0}")]
    Config(String),

    /// A failure injected by a test backend.
    #[error("{0}")]
    Injected(String),
}

/// Async persistence interface for the task store.
///
/// Every call is a single attempt: implementations must not retry. All data
/// operations are scoped to the authenticated user.
pub trait Backend: Send + Sync {
    /// Returns the authenticated user, or `None` when there is no session.
    fn current_user(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<User>, BackendError>> + Send;

    /// Lists the user's tasks, newest first by `created_at`.
    fn list_tasks(&self)
    -> impl std::future::Future<Output = Result<Vec<Task>, BackendError>> + Send;

    /// Inserts a task and returns the confirmed row (real id, owner, timestamps).
    fn insert_task(
        &self,
        fields: &NewTask,
    ) -> impl std::future::Future<Output = Result<Task, BackendError>> + Send;

    /// Applies a partial update to the task with the given id.
    fn update_task(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// Deletes the task with the given id.
    fn delete_task(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// Return the type of this backend.
    fn backend_type(&self) -> BackendType;
}
