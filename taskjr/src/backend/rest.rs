//! HTTP backend for the hosted REST service.
//!
//! Speaks the PostgREST dialect described in [`taskjr_proto::rest`]: the
//! project API key goes in the `apikey` header, the user's access token as a
//! bearer token, and row filters in the query string. Each operation is one
//! request; failures are surfaced as [`BackendError`] without retrying.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use url::Url;

use taskjr_proto::auth::User;
use taskjr_proto::rest::{
    API_KEY_HEADER, ErrorBody, ORDER_CREATED_DESC, RETURN_REPRESENTATION, TASKS_PATH, USER_PATH,
    eq_filter,
};
use taskjr_proto::task::{NewTask, Task, TaskId, TaskPatch};

use super::{Backend, BackendError, BackendType};

/// Connection settings for [`RestBackend`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project base URL (e.g. `https://xyz.supabase.co`).
    pub base_url: Url,
    /// Public project API key.
    pub api_key: String,
    /// The user's session token. Without one, requests are anonymous.
    pub access_token: Option<String>,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

/// [`Backend`] implementation over HTTP.
pub struct RestBackend {
    client: reqwest::Client,
    base_url: Url,
    bearer: String,
}

impl RestBackend {
    /// Builds a client for the given project.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Config`] if the API key is not a valid header
    /// value, or [`BackendError::Transport`] if the HTTP client cannot be
    /// created.
    pub fn new(config: &RestConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| BackendError::Config(format!("api key: {e}")))?;
        headers.insert(API_KEY_HEADER, api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        // Anonymous requests authenticate with the API key itself.
        let bearer = config
            .access_token
            .clone()
            .unwrap_or_else(|| config.api_key.clone());

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            bearer,
        })
    }

    /// Returns the project base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins an absolute resource path onto the base URL, keeping any path
    /// prefix the base carries.
    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}")).map_err(|e| BackendError::Config(e.to_string()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.bearer)
    }

    fn task_url(&self, id: &TaskId) -> Result<Url, BackendError> {
        let mut url = self.endpoint(TASKS_PATH)?;
        url.query_pairs_mut().append_pair("id", &eq_filter(id.as_str()));
        Ok(url)
    }
}

/// Passes successful responses through and converts the rest into errors.
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(BackendError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .ok()
        .filter(|m| !m.is_empty())
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    tracing::debug!(status = status.as_u16(), message = %message, "backend rejected request");
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}

impl Backend for RestBackend {
    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        let url = self.endpoint(USER_PATH)?;
        let response = self.request(Method::GET, url).send().await?;
        match check(response).await {
            Ok(response) => decode(response).await.map(Some),
            Err(BackendError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError> {
        let mut url = self.endpoint(TASKS_PATH)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", ORDER_CREATED_DESC);
        let response = self.request(Method::GET, url).send().await?;
        let tasks: Vec<Task> = decode(check(response).await?).await?;
        tracing::debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    async fn insert_task(&self, fields: &NewTask) -> Result<Task, BackendError> {
        let url = self.endpoint(TASKS_PATH)?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(fields)
            .send()
            .await?;
        let mut rows: Vec<Task> = decode(check(response).await?).await?;
        if rows.len() != 1 {
            return Err(BackendError::Decode(format!(
                "insert returned {} rows, expected 1",
                rows.len()
            )));
        }
        Ok(rows.remove(0))
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), BackendError> {
        let url = self.task_url(id)?;
        let response = self.request(Method::PATCH, url).json(patch).send().await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), BackendError> {
        let url = self.task_url(id)?;
        let response = self.request(Method::DELETE, url).send().await?;
        check(response).await?;
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Rest
    }
}
