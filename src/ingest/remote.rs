use crate::config::RemoteConfig;
use crate::ingest::{LogBatch, LogRequest};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("remote returned error status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, RemoteClientError>;

/// Forwards log requests to another instance's `/api/logs` endpoint.
#[derive(Debug)]
pub struct RemoteClient {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            timeout: config.timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request` with the same position state and return the remote batch.
    /// Plaintext bodies are turned into a one-shot batch since they carry no
    /// resumable offsets.
    pub async fn fetch(&self, request: &LogRequest) -> Result<LogBatch> {
        let url = format!("{}/api/logs", self.base_url);
        let positions = serde_json::to_string(&request.positions)?;
        let include = if request.include_archived { "true" } else { "false" };

        let mut builder = self.client.get(&url).query(&[
            ("type", request.role.as_str()),
            ("positions", positions.as_str()),
            ("includeCompressed", include),
        ]);
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        tracing::debug!(url = %url, role = %request.role, "Forwarding log request to remote");

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(RemoteClientError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        match serde_json::from_str::<LogBatch>(&body) {
            Ok(batch) => Ok(batch),
            Err(e) if is_json => Err(e.into()),
            Err(_) => {
                tracing::debug!(url = %url, "Remote answered with plaintext, treating as complete batch");
                Ok(plaintext_batch(&body, request))
            }
        }
    }

    fn classify(&self, e: reqwest::Error) -> RemoteClientError {
        if e.is_timeout() {
            tracing::warn!(url = %self.base_url, timeout_ms = self.timeout.as_millis(), "Remote request timed out");
            RemoteClientError::Timeout(self.timeout)
        } else {
            RemoteClientError::HttpError(e)
        }
    }
}

fn plaintext_batch(body: &str, request: &LogRequest) -> LogBatch {
    let logs = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();
    LogBatch::new(logs, request.positions.clone()).completed()
}

/// Prefer the `error` field of a JSON error body, else the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
