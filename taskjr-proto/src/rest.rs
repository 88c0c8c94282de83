//! REST dialect shared by the client backend and the local server.
//!
//! The hosted backend exposes tasks as a PostgREST-style resource: rows are
//! listed, inserted, patched and deleted over HTTP with row filters encoded
//! in the query string (`id=eq.<id>`), and the caller's identity is taken
//! from a bearer token.

use serde::{Deserialize, Serialize};

/// Path of the `tasks` resource.
pub const TASKS_PATH: &str = "/rest/v1/tasks";

/// Path of the current-user endpoint.
pub const USER_PATH: &str = "/auth/v1/user";

/// Header carrying the project API key.
pub const API_KEY_HEADER: &str = "apikey";

/// `Prefer` value asking the server to echo inserted rows.
pub const RETURN_REPRESENTATION: &str = "return=representation";

/// Ordering used when listing tasks: newest first.
pub const ORDER_CREATED_DESC: &str = "created_at.desc";

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub message: String,
}

impl ErrorBody {
    /// Creates an error body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Encodes an equality row filter value (`eq.<value>`).
#[must_use]
pub fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

/// Decodes an equality row filter value, returning the compared value.
///
/// Returns `None` for other operators or an empty value.
#[must_use]
pub fn parse_eq_filter(filter: &str) -> Option<&str> {
    filter.strip_prefix("eq.").filter(|v| !v.is_empty())
}
