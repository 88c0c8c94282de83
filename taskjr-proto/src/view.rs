//! Client-side view selectors: the status filter and the active view.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::TaskStatus;

/// Error returned when a selector string is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// Not one of `all`, `todo`, `in_progress`, `done`.
    #[error("unknown filter: {0} (expected all, todo, in_progress or done)")]
    UnknownFilter(String),
    /// Not one of `list`, `kanban`, `timeline`.
    #[error("unknown view: {0} (expected list, kanban or timeline)")]
    UnknownView(String),
}

/// Status filter applied to every projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// No status restriction.
    #[default]
    All,
    /// Only `todo` tasks.
    Todo,
    /// Only `in_progress` tasks.
    InProgress,
    /// Only `done` tasks.
    Done,
}

impl StatusFilter {
    /// Returns `true` if a task with `status` passes this filter.
    #[must_use]
    pub fn admits(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Todo => status == TaskStatus::Todo,
            Self::InProgress => status == TaskStatus::InProgress,
            Self::Done => status == TaskStatus::Done,
        }
    }

    /// Wire / CLI value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl From<TaskStatus> for StatusFilter {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Todo => Self::Todo,
            TaskStatus::InProgress => Self::InProgress,
            TaskStatus::Done => Self::Done,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(SelectorError::UnknownFilter(other.to_string())),
        }
    }
}

/// Which projection of the task collection is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Flat list in store order.
    #[default]
    List,
    /// Three status columns.
    Kanban,
    /// Grouped by due date.
    Timeline,
}

impl ViewMode {
    /// Wire / CLI value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Kanban => "kanban",
            Self::Timeline => "timeline",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Self::List),
            "kanban" => Ok(Self::Kanban),
            "timeline" => Ok(Self::Timeline),
            other => Err(SelectorError::UnknownView(other.to_string())),
        }
    }
}
