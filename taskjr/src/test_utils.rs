//! Shared fixtures for unit tests.

use chrono::{DateTime, TimeZone, Utc};

use taskjr_proto::auth::User;
use taskjr_proto::task::{Priority, Task, TaskId, TaskStatus};

/// A fixed instant all fixtures are built around.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

/// A confirmed `todo`/`medium` task owned by `user-1`.
pub fn make_task(id: &str, title: &str) -> Task {
    Task {
        id: TaskId::new(id),
        owner_id: "user-1".to_string(),
        title: title.to_string(),
        description: None,
        status: TaskStatus::Todo,
        priority: Priority::Medium,
        due_date: None,
        created_at: epoch(),
        updated_at: epoch(),
    }
}

/// The user that owns [`make_task`] fixtures.
pub fn test_user() -> User {
    User {
        id: "user-1".to_string(),
        email: Some("user@example.com".to_string()),
    }
}
