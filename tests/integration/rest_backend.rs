//! Integration tests for the REST backend against a live local server.
//!
//! Each test starts `taskjr-server` on an ephemeral port and drives it
//! through `RestBackend`, directly and through `TaskStore`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use url::Url;

use taskjr::backend::rest::{RestBackend, RestConfig};
use taskjr::backend::{Backend, BackendError, BackendType};
use taskjr::store::TaskStore;
use taskjr_proto::task::{NewTask, Priority, TaskId, TaskPatch, TaskStatus};
use taskjr_server::config::UserAccount;
use taskjr_server::server::{ServerState, start_server_with_state};

const API_KEY: &str = "anon-key";

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn account(name: &str) -> UserAccount {
    UserAccount {
        token: format!("{name}-token"),
        id: name.to_string(),
        email: Some(format!("{name}@example.com")),
    }
}

async fn start_test_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let state = ServerState::new([account("alice"), account("bob")]).with_api_key(API_KEY);
    start_server_with_state("127.0.0.1:0", Arc::new(state))
        .await
        .unwrap()
}

fn client(addr: SocketAddr, token: Option<&str>) -> RestBackend {
    RestBackend::new(&RestConfig {
        base_url: Url::parse(&format!("http://{addr}")).unwrap(),
        api_key: API_KEY.to_string(),
        access_token: token.map(str::to_string),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ===========================================================================
// Session
// ===========================================================================

#[tokio::test]
async fn current_user_resolves_bearer_token() {
    let (addr, _handle) = start_test_server().await;
    let backend = client(addr, Some("alice-token"));

    let user = backend.current_user().await.unwrap().unwrap();
    assert_eq!(user.id, "alice");
    assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    assert_eq!(backend.backend_type(), BackendType::Rest);
}

#[tokio::test]
async fn unknown_or_missing_token_means_signed_out() {
    let (addr, _handle) = start_test_server().await;
    assert_eq!(client(addr, Some("forged")).current_user().await.unwrap(), None);
    assert_eq!(client(addr, None).current_user().await.unwrap(), None);
}

#[tokio::test]
async fn data_calls_without_session_are_unauthorized() {
    let (addr, _handle) = start_test_server().await;
    let err = client(addr, None).list_tasks().await.unwrap_err();
    assert!(matches!(err, BackendError::Unauthorized));
}

// ===========================================================================
// Rows
// ===========================================================================

#[tokio::test]
async fn insert_returns_server_assigned_row() {
    let (addr, _handle) = start_test_server().await;
    let backend = client(addr, Some("alice-token"));

    let fields = NewTask::new("Plan sprint")
        .with_description("two weeks")
        .with_priority(Priority::High)
        .with_due_date(date(2025, 5, 1));
    let row = backend.insert_task(&fields).await.unwrap();

    assert!(!row.id.as_str().is_empty());
    assert_eq!(row.owner_id, "alice");
    assert_eq!(row.title, "Plan sprint");
    assert_eq!(row.description.as_deref(), Some("two weeks"));
    assert_eq!(row.status, TaskStatus::Todo);
    assert_eq!(row.priority, Priority::High);
    assert_eq!(row.due_date, Some(date(2025, 5, 1)));
    assert_eq!(row.created_at, row.updated_at);
}

#[tokio::test]
async fn list_is_newest_first_and_owner_scoped() {
    let (addr, _handle) = start_test_server().await;
    let alice = client(addr, Some("alice-token"));
    let bob = client(addr, Some("bob-token"));

    let first = alice.insert_task(&NewTask::new("first")).await.unwrap();
    let second = alice.insert_task(&NewTask::new("second")).await.unwrap();
    bob.insert_task(&NewTask::new("bob's")).await.unwrap();

    assert_eq!(alice.list_tasks().await.unwrap(), vec![second, first.clone()]);
    assert_eq!(bob.list_tasks().await.unwrap().len(), 1);

    let err = bob
        .update_task(&first.id, &TaskPatch::status(TaskStatus::Done))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 404, .. }));
}

#[tokio::test]
async fn patch_clears_nullable_fields() {
    let (addr, _handle) = start_test_server().await;
    let backend = client(addr, Some("alice-token"));
    let row = backend
        .insert_task(
            &NewTask::new("t")
                .with_description("d")
                .with_due_date(date(2025, 5, 1)),
        )
        .await
        .unwrap();

    let patch = TaskPatch::new()
        .with_description(None)
        .with_due_date(None)
        .with_status(TaskStatus::InProgress);
    backend.update_task(&row.id, &patch).await.unwrap();

    let updated = backend.list_tasks().await.unwrap().remove(0);
    assert_eq!(updated.description, None);
    assert_eq!(updated.due_date, None);
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(updated.title, "t");
    assert!(updated.updated_at > row.updated_at);
}

#[tokio::test]
async fn unknown_id_is_404_with_message() {
    let (addr, _handle) = start_test_server().await;
    let backend = client(addr, Some("alice-token"));

    let err = backend.delete_task(&TaskId::new("ghost")).await.unwrap_err();
    match err {
        BackendError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no task with id ghost");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_title_is_rejected_by_server() {
    let (addr, _handle) = start_test_server().await;
    let err = client(addr, Some("alice-token"))
        .insert_task(&NewTask::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 400, .. }));
}

#[tokio::test]
async fn wrong_api_key_is_unauthorized() {
    let (addr, _handle) = start_test_server().await;
    let backend = RestBackend::new(&RestConfig {
        base_url: Url::parse(&format!("http://{addr}")).unwrap(),
        api_key: "other-key".to_string(),
        access_token: Some("alice-token".to_string()),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    assert!(matches!(
        backend.list_tasks().await,
        Err(BackendError::Unauthorized)
    ));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let (addr, handle) = start_test_server().await;
    handle.abort();
    let _ = handle.await;
    let err = client(addr, Some("alice-token"))
        .list_tasks()
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}

// ===========================================================================
// Store over HTTP
// ===========================================================================

#[tokio::test]
async fn store_round_trip_over_http() {
    let (addr, _handle) = start_test_server().await;
    let store = TaskStore::new(client(addr, Some("alice-token")));

    assert!(store.check_session().await.unwrap().is_some());
    store.fetch_tasks().await.unwrap();
    assert!(store.tasks().is_empty());

    let a = store.add_task(NewTask::new("A")).await.unwrap();
    let b = store.add_task(NewTask::new("B")).await.unwrap();
    assert!(store.move_task(&a.id, TaskStatus::Done).await.unwrap());
    store.delete_task(&b.id).await.unwrap();

    let local = store.tasks();
    store.fetch_tasks().await.unwrap();
    let remote = store.tasks();
    assert_eq!(local.len(), 1);
    assert_eq!(remote.len(), 1);
    assert_eq!(local[0].id, remote[0].id);
    assert_eq!(remote[0].status, TaskStatus::Done);
}

#[tokio::test]
async fn store_records_server_message_on_rollback() {
    let (addr, _handle) = start_test_server().await;
    let alice = TaskStore::new(client(addr, Some("alice-token")));
    alice.fetch_tasks().await.unwrap();
    let task = alice.add_task(NewTask::new("shared")).await.unwrap();

    // The row disappears behind the store's back.
    client(addr, Some("alice-token"))
        .delete_task(&task.id)
        .await
        .unwrap();

    let result = alice
        .update_task(&task.id, TaskPatch::new().with_title("renamed"))
        .await;
    assert!(result.is_err());
    assert_eq!(alice.task(&task.id).unwrap().title, "shared");
    assert_eq!(
        alice.error(),
        Some(format!("no task with id {}", task.id))
    );
}
