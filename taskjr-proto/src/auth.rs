//! Session identity returned by the backend's auth endpoint.

use serde::{Deserialize, Serialize};

/// The currently authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user id; matches `Task::owner_id` of the user's rows.
    pub id: String,
    /// Account email, when the backend exposes it.
    #[serde(default)]
    pub email: Option<String>,
}
