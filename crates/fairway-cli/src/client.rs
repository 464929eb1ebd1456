//! HTTP client for the fairway-api snapshot endpoints.

use fairway_core::util::normalize_text_option;
use fairway_core::{Snapshot, SyncRequest};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid server configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Server request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server error: {0}")]
    Api(String),
}

/// Result of a push the server answered.
#[derive(Debug)]
pub enum PushOutcome {
    Accepted(Box<Snapshot>),
    Conflict {
        current_version: u64,
        server_snapshot: Box<Snapshot>,
    },
}

#[derive(Clone)]
pub struct SyncClient {
    snapshot_url: String,
    key: Option<String>,
    client: reqwest::Client,
}

impl SyncClient {
    pub fn new(server: impl Into<String>, key: Option<String>) -> Result<Self, ClientError> {
        let server = normalize_server_url(server.into())?;
        Ok(Self {
            snapshot_url: format!("{server}/v1/snapshot"),
            key: normalize_text_option(key),
            client: reqwest::Client::builder().build()?,
        })
    }

    pub fn snapshot_url(&self) -> &str {
        &self.snapshot_url
    }

    pub async fn fetch(&self) -> Result<Snapshot, ClientError> {
        let response = self
            .authorized(self.client.get(&self.snapshot_url))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(parse_api_error(status, &body)));
        }

        Ok(response.json::<Snapshot>().await?)
    }

    pub async fn push(&self, request: &SyncRequest) -> Result<PushOutcome, ClientError> {
        let body = request
            .to_value()
            .map_err(|error| ClientError::InvalidConfiguration(error.to_string()))?;
        let response = self
            .authorized(self.client.put(&self.snapshot_url))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let payload = response.json::<PushResponse>().await?;
                Ok(PushOutcome::Accepted(Box::new(payload.merged_data)))
            }
            StatusCode::CONFLICT => {
                let payload = response.json::<ConflictResponse>().await?;
                Ok(PushOutcome::Conflict {
                    current_version: payload.current_version,
                    server_snapshot: Box::new(payload.server_data),
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::Api(parse_api_error(status, &body)))
            }
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushResponse {
    merged_data: Snapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictResponse {
    current_version: u64,
    server_data: Snapshot,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
    suggestion: Option<String>,
}

pub fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            let mut rendered = format!("{} ({})", message.trim(), status.as_u16());
            if let Some(suggestion) = payload.suggestion {
                rendered.push_str(". ");
                rendered.push_str(suggestion.trim());
            }
            return rendered;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

pub fn normalize_server_url(raw: String) -> Result<String, ClientError> {
    let server = normalize_text_option(Some(raw)).ok_or_else(|| {
        ClientError::InvalidConfiguration("server URL must not be empty".to_string())
    })?;
    if server.starts_with("http://") || server.starts_with("https://") {
        Ok(server.trim_end_matches('/').to_string())
    } else {
        Err(ClientError::InvalidConfiguration(
            "server URL must include http:// or https://".to_string(),
        ))
    }
}
