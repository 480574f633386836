use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://notes-api.keepsync.dev";

#[derive(Debug, Error)]
pub enum KeepError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("api returned {got} change results for {expected} changes")]
    ResultMismatch { expected: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

#[derive(Clone)]
pub struct KeepClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl KeepClient {
    pub fn new(token: impl Into<String>) -> Result<Self, KeepError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, KeepError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    /// Replaces the HTTP client with one that aborts requests after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, KeepError> {
        self.http = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Fetches every checklist note visible to the account, in server order.
    pub async fn fetch_lists(&self) -> Result<Vec<RemoteList>, KeepError> {
        let mut url = self.endpoint("/v1/lists")?;
        url.query_pairs_mut().append_pair("type", "checklist");
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        let payload: ListsResponse = Self::handle_response(response).await?;
        Ok(payload.lists)
    }

    /// Sends a batch of changes and flushes it. The server applies each change
    /// independently, so the returned outcomes line up with `changes` one to one.
    pub async fn apply_changes(&self, changes: &[Change]) -> Result<Vec<ChangeOutcome>, KeepError> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint("/v1/lists/changes")?;
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(&ChangesRequest { changes })
            .send()
            .await?;
        let payload: ChangesResponse = Self::handle_response(response).await?;
        if payload.results.len() != changes.len() {
            return Err(KeepError::ResultMismatch {
                expected: changes.len(),
                got: payload.results.len(),
            });
        }
        Ok(payload.results)
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, KeepError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, KeepError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(KeepError::Api { status, body })
        }
    }
}

impl KeepError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            KeepError::Api { status, .. } => Some(classify_api_status(*status)),
            KeepError::Request(err) if err.is_timeout() || err.is_connect() => {
                Some(ApiErrorClass::Transient)
            }
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self.classification(), Some(ApiErrorClass::Auth))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.classification(),
            Some(ApiErrorClass::RateLimit | ApiErrorClass::Transient)
        )
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_EARLY
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RemoteList {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub items: Vec<RemoteItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RemoteItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default = "default_true")]
    pub show_checkboxes: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    AddItem {
        list_id: String,
        text: String,
        checked: bool,
    },
    UpdateItem {
        list_id: String,
        item_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },
    RemoveItem {
        list_id: String,
        item_id: String,
    },
    ReorderList {
        list_id: String,
        item_ids: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChangeOutcome {
    pub status: ChangeStatus,
    /// Id assigned by the server to a newly added item.
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ChangeOutcome {
    pub fn is_ok(&self) -> bool {
        self.status == ChangeStatus::Ok
    }
}

#[derive(Debug, Deserialize)]
struct ListsResponse {
    #[serde(default)]
    lists: Vec<RemoteList>,
}

#[derive(Debug, Serialize)]
struct ChangesRequest<'a> {
    changes: &'a [Change],
}

#[derive(Debug, Deserialize)]
struct ChangesResponse {
    results: Vec<ChangeOutcome>,
}
