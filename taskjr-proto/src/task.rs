//! Task data model for Taskjr.
//!
//! Defines the [`Task`] row as the hosted backend stores it, the
//! [`NewTask`] fields a client supplies on creation, and the partial
//! [`TaskPatch`] used for updates. All types serialize to the JSON shapes
//! of the `tasks` REST resource (`snake_case` enum values, `user_id` for the
//! owner, RFC 3339 timestamps, `YYYY-MM-DD` due dates).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Errors produced while validating or parsing task fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// Limit that was exceeded.
        max: usize,
    },
    /// A string did not name a known status.
    #[error("unknown status: {0} (expected todo, in_progress or done)")]
    UnknownStatus(String),
    /// A string did not name a known priority.
    #[error("unknown priority: {0} (expected low, medium or high)")]
    UnknownPriority(String),
    /// A string was not a valid `YYYY-MM-DD` date.
    #[error("invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Validates a task title against the default length limit.
///
/// # Errors
///
/// Returns [`TaskError::TitleEmpty`] for blank titles and
/// [`TaskError::TitleTooLong`] past [`MAX_TASK_TITLE_LENGTH`] characters.
pub fn validate_title(title: &str) -> Result<(), TaskError> {
    validate_title_with_limit(title, MAX_TASK_TITLE_LENGTH)
}

/// Validates a task title against a caller-supplied length limit.
///
/// Length is counted in `char`s, not bytes.
///
/// # Errors
///
/// Returns [`TaskError::TitleEmpty`] for blank titles and
/// [`TaskError::TitleTooLong`] past `max` characters.
pub fn validate_title_with_limit(title: &str, max: usize) -> Result<(), TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::TitleEmpty);
    }
    if title.chars().count() > max {
        return Err(TaskError::TitleTooLong { max });
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` due date.
///
/// # Errors
///
/// Returns [`TaskError::InvalidDate`] if the string is not a calendar date.
pub fn parse_due_date(s: &str) -> Result<NaiveDate, TaskError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| TaskError::InvalidDate(s.to_string()))
}

/// Prefix of locally generated placeholder ids.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

/// Opaque task identifier.
///
/// Confirmed ids are assigned by the backend. Until then a task carries a
/// placeholder id generated locally by [`TaskId::placeholder`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an identifier string received from the backend.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, time-ordered placeholder identifier
    /// (`temp-` followed by a UUID v7).
    #[must_use]
    pub fn placeholder() -> Self {
        Self(format!("{PLACEHOLDER_PREFIX}{}", Uuid::now_v7()))
    }

    /// Returns `true` for ids made by [`TaskId::placeholder`].
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }

    /// Returns the string form of this identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Workflow status of a task. Also names the kanban columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Every status, in board column order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Wire value (`todo`, `in_progress`, `done`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Human-readable column title.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(TaskError::UnknownStatus(other.to_string())),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority (the default for new tasks).
    #[default]
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// Wire value (`low`, `medium`, `high`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TaskError::UnknownPriority(other.to_string())),
        }
    }
}

/// A task row as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Backend-assigned id, or a placeholder until the insert is confirmed.
    pub id: TaskId,
    /// Owning user id. Empty for placeholders.
    #[serde(rename = "user_id", default)]
    pub owner_id: String,
    /// Non-empty title.
    pub title: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: Priority,
    /// Optional due date.
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<NaiveDate>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds the locally-displayed stand-in for a task that has not been
    /// confirmed by the backend yet.
    #[must_use]
    pub fn placeholder(fields: &NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::placeholder(),
            owner_id: String::new(),
            title: fields.title.clone(),
            description: fields.description.clone(),
            status: fields.status,
            priority: fields.priority,
            due_date: fields.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` until the backend has confirmed the insert.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id.is_placeholder()
    }
}

/// Fields supplied by the user when creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Non-empty title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Initial status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Optional due date.
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    /// Creates a `todo`, `medium` task with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            priority: Priority::default(),
            due_date: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Partial update of a task.
///
/// `None` leaves a field unchanged. The nullable fields use a nested
/// `Option` so that `Some(None)` clears the value. Only present fields are
/// serialized, so the JSON body of a patch names exactly what changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub description: Option<Option<String>>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// New due date, or `Some(None)` to clear it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch that only changes the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets or clears the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets or clears the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    /// Writes every present field into `task`.
    ///
    /// Does not touch `id`, owner or timestamps.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

/// Keeps an explicit `null` distinguishable from an absent field.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accepts either a bare date or a full timestamp for `due_date`.
///
/// Hosted backends return `date` columns as `YYYY-MM-DD` but `timestamptz`
/// columns as RFC 3339; only the calendar date is kept.
fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| Some(dt.date_naive()))
        .map_err(|_| serde::de::Error::custom(format!("invalid due_date: {raw}")))
}
