//! Integration tests for optimistic store sync over the in-memory backend.
//!
//! Covers the local-vs-backend agreement after successful operations, the
//! rollback guarantees after failures, placeholder reconciliation under
//! interleaved adds, and the same-task rollback race with and without
//! per-task serialization.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::future::join_all;

use taskjr::backend::memory::{MemoryBackend, Operation};
use taskjr::store::{StoreError, StoreOptions, TaskStore};
use taskjr_proto::auth::User;
use taskjr_proto::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
use taskjr_proto::view::StatusFilter;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn user() -> User {
    User {
        id: "user-1".to_string(),
        email: Some("user@example.com".to_string()),
    }
}

/// A stored row created `age_secs` before a fixed instant.
fn row(id: &str, title: &str, status: TaskStatus, age_secs: i64) -> Task {
    let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() - chrono::TimeDelta::seconds(age_secs);
    Task {
        id: TaskId::new(id),
        owner_id: "user-1".to_string(),
        title: title.to_string(),
        description: None,
        status,
        priority: Priority::Medium,
        due_date: None,
        created_at: created,
        updated_at: created,
    }
}

/// Store over `[A(todo), B(done)]`, already fetched.
async fn store_with_a_and_b(options: StoreOptions) -> TaskStore<MemoryBackend> {
    let backend = MemoryBackend::new(user()).with_tasks(vec![
        row("a", "Task A", TaskStatus::Todo, 0),
        row("b", "Task B", TaskStatus::Done, 60),
    ]);
    let store = TaskStore::with_options(backend, options);
    store.fetch_tasks().await.unwrap();
    store
}

fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
}

// ===========================================================================
// Successful operations
// ===========================================================================

#[tokio::test]
async fn successful_sequence_matches_backend_replay() {
    let store = TaskStore::new(MemoryBackend::new(user()));
    store.fetch_tasks().await.unwrap();

    let first = store.add_task(NewTask::new("Write design doc")).await.unwrap();
    let second = store
        .add_task(
            NewTask::new("Review PR")
                .with_description("the big one")
                .with_priority(Priority::High),
        )
        .await
        .unwrap();
    let third = store.add_task(NewTask::new("Lunch")).await.unwrap();

    store
        .update_task(&first.id, TaskPatch::status(TaskStatus::InProgress))
        .await
        .unwrap();
    store
        .update_task(
            &second.id,
            TaskPatch::new()
                .with_title("Review the PR")
                .with_description(None),
        )
        .await
        .unwrap();
    store.delete_task(&third.id).await.unwrap();
    assert!(store.move_task(&first.id, TaskStatus::Done).await.unwrap());

    let local = store.tasks();
    assert_eq!(ids(&local), vec![second.id.as_str(), first.id.as_str()]);
    for (local, remote) in local.iter().zip(store.backend().rows()) {
        // Server timestamps may differ; everything else must agree.
        assert_eq!(local.id, remote.id);
        assert_eq!(local.title, remote.title);
        assert_eq!(local.description, remote.description);
        assert_eq!(local.status, remote.status);
        assert_eq!(local.priority, remote.priority);
        assert_eq!(local.due_date, remote.due_date);
    }

    // A fresh fetch adopts the backend's rows wholesale.
    store.fetch_tasks().await.unwrap();
    assert_eq!(store.tasks(), store.backend().rows());
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn update_a_to_in_progress_advances_updated_at() {
    let store = store_with_a_and_b(StoreOptions::default()).await;
    let before = store.task(&TaskId::new("a")).unwrap();

    store
        .update_task(&TaskId::new("a"), TaskPatch::status(TaskStatus::InProgress))
        .await
        .unwrap();

    let tasks = store.tasks();
    assert_eq!(ids(&tasks), vec!["a", "b"]);
    assert_eq!(tasks[0].status, TaskStatus::InProgress);
    assert!(tasks[0].updated_at > before.updated_at);
    assert_eq!(tasks[1].status, TaskStatus::Done);
}

#[tokio::test]
async fn delete_b_leaves_a() {
    let store = store_with_a_and_b(StoreOptions::default()).await;
    store.delete_task(&TaskId::new("b")).await.unwrap();
    assert_eq!(ids(&store.tasks()), vec!["a"]);
    assert_eq!(ids(&store.backend().rows()), vec!["a"]);
}

#[tokio::test]
async fn filter_and_search_select_matching_tasks() {
    let backend = MemoryBackend::new(user()).with_tasks(vec![
        row("1", "Project plan", TaskStatus::Done, 0),
        row("2", "project retro", TaskStatus::Todo, 10),
        {
            let mut t = row("3", "Groceries", TaskStatus::Done, 20);
            t.description = Some("for the PROJECT party".to_string());
            t
        },
        row("4", "Laundry", TaskStatus::Done, 30),
    ]);
    let store = TaskStore::new(backend);
    store.fetch_tasks().await.unwrap();

    store.set_filter(StatusFilter::Done);
    store.set_search_query("proj");

    assert_eq!(ids(&store.visible_tasks()), vec!["1", "3"]);
    // Selection never changes the collection itself.
    assert_eq!(store.tasks().len(), 4);
}

#[tokio::test]
async fn update_missing_id_is_silent_noop() {
    let store = store_with_a_and_b(StoreOptions::default()).await;
    let before = store.snapshot();

    store
        .update_task(&TaskId::new("missing"), TaskPatch::new().with_title("x"))
        .await
        .unwrap();

    assert_eq!(store.snapshot(), before);
    assert!(!store.backend().calls().contains(&Operation::Update));
}

// ===========================================================================
// Failures and rollback
// ===========================================================================

#[tokio::test]
async fn add_failure_restores_exact_collection() {
    let store = store_with_a_and_b(StoreOptions::default()).await;
    let before = store.tasks();
    store.backend().fail_next(Operation::Insert, "insert failed: quota exceeded");

    let err = store
        .add_task(NewTask::new("X").with_priority(Priority::Low))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Backend(_)));
    assert_eq!(store.tasks(), before);
    assert_eq!(
        store.error().as_deref(),
        Some("insert failed: quota exceeded")
    );
}

#[tokio::test]
async fn update_failure_restores_every_field() {
    let store = store_with_a_and_b(StoreOptions::default()).await;
    let before = store.task(&TaskId::new("b")).unwrap();
    store.backend().fail_always(Operation::Update, "read-only");

    let patches = [
        TaskPatch::new().with_title("renamed"),
        TaskPatch::new().with_description(Some("notes".to_string())),
        TaskPatch::status(TaskStatus::Todo),
        TaskPatch::new().with_priority(Priority::High),
        TaskPatch::new().with_due_date(chrono::NaiveDate::from_ymd_opt(2025, 4, 1)),
        TaskPatch::new()
            .with_title("all")
            .with_status(TaskStatus::InProgress)
            .with_priority(Priority::Low),
    ];
    for patch in patches {
        assert!(store.update_task(&TaskId::new("b"), patch).await.is_err());
        assert_eq!(store.task(&TaskId::new("b")).unwrap(), before);
    }
    assert_eq!(store.error().as_deref(), Some("read-only"));
}

#[tokio::test]
async fn delete_failure_restores_order() {
    let store = store_with_a_and_b(StoreOptions::default()).await;
    let before = store.tasks();
    store.backend().fail_next(Operation::Delete, "conflict");

    assert!(store.delete_task(&TaskId::new("a")).await.is_err());

    assert_eq!(store.tasks(), before);
    assert_eq!(store.error().as_deref(), Some("conflict"));
}

#[tokio::test]
async fn signed_out_session_fails_fetch() {
    let store = TaskStore::new(MemoryBackend::signed_out());
    assert_eq!(store.check_session().await.unwrap(), None);
    let err = store.fetch_tasks().await.unwrap_err();
    assert_eq!(err.to_string(), "not signed in");
    assert_eq!(store.error().as_deref(), Some("not signed in"));
    assert!(store.tasks().is_empty());
}

// ===========================================================================
// Concurrency
// ===========================================================================

#[tokio::test]
async fn interleaved_adds_each_replace_their_own_placeholder() {
    let store = TaskStore::new(MemoryBackend::new(user()));
    // Earlier calls resolve later.
    for ms in [60, 40, 20] {
        store
            .backend()
            .delay_next(Operation::Insert, Duration::from_millis(ms));
    }

    let results = join_all(
        ["one", "two", "three", "four"]
            .into_iter()
            .map(|title| store.add_task(NewTask::new(title))),
    )
    .await;
    let confirmed: Vec<Task> = results.into_iter().map(Result::unwrap).collect();

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 4);
    assert!(tasks.iter().all(|t| !t.is_placeholder()));
    // Local order is the order the placeholders were inserted, newest first.
    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["four", "three", "two", "one"]);
    for task in &confirmed {
        assert_eq!(store.task(&task.id).as_ref(), Some(task));
    }
}

#[tokio::test]
async fn failures_on_different_tasks_are_independent() {
    let store = store_with_a_and_b(StoreOptions::default()).await;
    store.backend().fail_next(Operation::Update, "boom");
    store
        .backend()
        .delay_next(Operation::Update, Duration::from_millis(30));

    let id_a = TaskId::new("a");
    let id_b = TaskId::new("b");
    let (a, b) = tokio::join!(
        store.update_task(&id_a, TaskPatch::new().with_title("A2")),
        store.update_task(&id_b, TaskPatch::new().with_title("B2")),
    );

    assert!(a.is_err());
    assert!(b.is_ok());
    assert_eq!(store.task(&TaskId::new("a")).unwrap().title, "Task A");
    assert_eq!(store.task(&TaskId::new("b")).unwrap().title, "B2");
}

#[tokio::test]
async fn same_task_race_rolls_back_newer_change_by_default() {
    let store = store_with_a_and_b(StoreOptions::default()).await;
    let id = TaskId::new("a");
    store.backend().fail_next(Operation::Update, "timeout");
    store
        .backend()
        .delay_next(Operation::Update, Duration::from_millis(40));

    let (first, second) = tokio::join!(
        store.update_task(&id, TaskPatch::new().with_title("first")),
        store.update_task(&id, TaskPatch::new().with_title("second")),
    );

    assert!(first.is_err());
    assert!(second.is_ok());
    // The slow failure restores the value it captured: the pre-race title.
    assert_eq!(store.task(&id).unwrap().title, "Task A");
    assert_eq!(store.backend().rows()[0].title, "second");
}

#[tokio::test]
async fn same_task_race_is_ordered_when_serialized() {
    let store = Arc::new(
        store_with_a_and_b(StoreOptions {
            serialize_per_task: true,
            ..StoreOptions::default()
        })
        .await,
    );
    let id = TaskId::new("a");
    store.backend().fail_next(Operation::Update, "timeout");
    store
        .backend()
        .delay_next(Operation::Update, Duration::from_millis(40));

    let first = tokio::spawn({
        let store = Arc::clone(&store);
        let id = id.clone();
        async move { store.update_task(&id, TaskPatch::new().with_title("first")).await }
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = store.update_task(&id, TaskPatch::new().with_title("second")).await;

    assert!(first.await.unwrap().is_err());
    assert!(second.is_ok());
    assert_eq!(store.task(&id).unwrap().title, "second");
    assert_eq!(store.backend().rows()[0].title, "second");
}
