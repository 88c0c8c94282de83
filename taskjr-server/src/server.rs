//! HTTP surface: the auth and tasks endpoints of the REST dialect the
//! client speaks.
//!
//! Routes:
//! - `GET /auth/v1/user` returns the user behind the bearer token
//! - `GET /rest/v1/tasks` lists the caller's rows, newest first
//! - `POST /rest/v1/tasks` inserts one row and returns `[row]`
//! - `PATCH /rest/v1/tasks?id=eq.<id>` applies a partial update
//! - `DELETE /rest/v1/tasks?id=eq.<id>` deletes a row
//!
//! Errors are `{"message": ...}` bodies: 401 for a missing or unknown
//! token, 400 for a malformed body or filter, 404 for an unknown id.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::de::DeserializeOwned;
use thiserror::Error;

use taskjr_proto::auth::User;
use taskjr_proto::rest::{API_KEY_HEADER, ErrorBody, TASKS_PATH, USER_PATH, parse_eq_filter};
use taskjr_proto::task::{NewTask, TaskId, TaskPatch, validate_title};

use crate::config::{ServerConfig, UserAccount};
use crate::store::TaskTable;

/// Errors starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or inspecting the listener failed.
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared server state: the accounts that may sign in and the task table.
pub struct ServerState {
    /// Bearer token to user.
    users: HashMap<String, User>,
    /// Required `apikey` header value, if any.
    api_key: Option<String>,
    /// All task rows.
    pub tasks: TaskTable,
}

impl ServerState {
    /// Creates state with the given accounts and no API key requirement.
    #[must_use]
    pub fn new(accounts: impl IntoIterator<Item = UserAccount>) -> Self {
        Self {
            users: accounts
                .into_iter()
                .map(|a| {
                    let user = a.user();
                    (a.token, user)
                })
                .collect(),
            api_key: None,
            tasks: TaskTable::new(),
        }
    }

    /// Requires every request to carry `apikey: <key>`.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builds state from resolved configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let state = Self::new(config.users.iter().cloned());
        match &config.api_key {
            Some(key) => state.with_api_key(key.clone()),
            None => state,
        }
    }

    /// Resolves the caller from the `apikey` and `Authorization` headers.
    fn authenticate(&self, headers: &HeaderMap) -> Result<&User, ApiError> {
        if let Some(expected) = &self.api_key {
            let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
            if presented != Some(expected.as_str()) {
                return Err(ApiError::unauthorized("invalid api key"));
            }
        }
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
        self.users
            .get(token)
            .ok_or_else(|| ApiError::unauthorized("invalid token"))
    }
}

/// An error response with a JSON message body.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(id: &TaskId) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("no task with id {id}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody::new(self.message))).into_response()
    }
}

/// Parses a JSON body, mapping any failure to 400.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid body: {e}")))
}

/// Extracts the row id from an `id=eq.<id>` filter.
fn id_filter(query: &HashMap<String, String>) -> Result<TaskId, ApiError> {
    query
        .get("id")
        .and_then(|f| parse_eq_filter(f))
        .map(TaskId::new)
        .ok_or_else(|| ApiError::bad_request("expected an id=eq.<id> filter"))
}

async fn current_user(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let user = state.authenticate(&headers)?;
    Ok(Json(user.clone()))
}

async fn list_tasks(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = state.authenticate(&headers)?;
    let rows = state.tasks.list(&user.id).await;
    tracing::debug!(user_id = %user.id, count = rows.len(), "list");
    Ok(Json(rows).into_response())
}

async fn insert_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let user = state.authenticate(&headers)?;
    let fields: NewTask = parse_body(&body)?;
    validate_title(&fields.title).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let row = state.tasks.insert(&user.id, fields).await;
    tracing::info!(user_id = %user.id, task_id = %row.id, "task created");
    Ok((StatusCode::CREATED, Json(vec![row])).into_response())
}

async fn update_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let user = state.authenticate(&headers)?;
    let id = id_filter(&query)?;
    let patch: TaskPatch = parse_body(&body)?;
    if let Some(title) = &patch.title {
        validate_title(title).map_err(|e| ApiError::bad_request(e.to_string()))?;
    }
    match state.tasks.update(&user.id, &id, &patch).await {
        Some(_) => {
            tracing::info!(user_id = %user.id, task_id = %id, "task updated");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::not_found(&id)),
    }
}

async fn delete_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<StatusCode, ApiError> {
    let user = state.authenticate(&headers)?;
    let id = id_filter(&query)?;
    if state.tasks.delete(&user.id, &id).await {
        tracing::info!(user_id = %user.id, task_id = %id, "task deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(&id))
    }
}

/// Builds the router over the given state.
pub fn router(state: Arc<ServerState>) -> axum::Router {
    axum::Router::new()
        .route(USER_PATH, get(current_user))
        .route(
            TASKS_PATH,
            get(list_tasks)
                .post(insert_task)
                .patch(update_task)
                .delete(delete_task),
        )
        .with_state(state)
}

/// Start the server with the given state on the given address.
///
/// Binding `127.0.0.1:0` picks a free port; the bound address is returned
/// alongside the serving task's handle.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), ServerError> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}
