//! Loopback HTTP implementation of [`TaskApi`].

use std::time::Duration;

use async_trait::async_trait;
use osae_protocol::config_models::{TaskSettings, WorkerSettings};
use osae_protocol::task_models::ApprovalDecision;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::debug;

use super::error::ClientError;
use super::normalize::extract_task_id;
use super::TaskApi;

/// HTTP client for the worker's task API.
#[derive(Debug, Clone)]
pub struct HttpTaskClient {
    base_url: String,
    http: reqwest::Client,
    create_timeout: Duration,
    poll_timeout: Option<Duration>,
}

impl HttpTaskClient {
    /// Build a client from the worker and task settings.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::BaseUrlMissing` if `worker.base_url` is blank.
    pub fn new(worker: &WorkerSettings, tasks: &TaskSettings) -> Result<Self, ClientError> {
        let trimmed = worker.base_url.trim();
        if trimmed.is_empty() {
            return Err(ClientError::BaseUrlMissing);
        }

        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            create_timeout: tasks.create_timeout(),
            poll_timeout: tasks.poll_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        let trimmed = path.trim();
        if trimmed.starts_with('/') {
            format!("{}{}", self.base_url, trimmed)
        } else {
            format!("{}/{}", self.base_url, trimmed)
        }
    }

    #[must_use]
    pub fn task_path(task_id: &str) -> String {
        format!("/task/{}", task_id.trim())
    }

    #[must_use]
    pub fn approve_path(task_id: &str) -> String {
        format!("/task/{}/approve", task_id.trim())
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|error| transport_error(url, &error))?;
        debug!(url, status = %response.status(), "worker responded");
        Ok(response)
    }

    async fn send_for_json(&self, url: &str, request: RequestBuilder) -> Result<Value, ClientError> {
        let response = self.send(url, request).await?;
        decode_json_response(url, response).await
    }

    async fn send_for_status(&self, url: &str, request: RequestBuilder) -> Result<(), ClientError> {
        let response = self.send(url, request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .bytes()
            .await
            .map_err(|error| transport_error(url, &error))?;
        Err(format_http_error(status.as_u16(), &body))
    }
}

#[async_trait]
impl TaskApi for HttpTaskClient {
    async fn create_task(&self, prompt: &str) -> Result<String, ClientError> {
        let url = self.endpoint("/task");
        let request = self
            .http
            .post(url.as_str())
            .timeout(self.create_timeout)
            .json(&json!({ "prompt": prompt }));

        let body = self.send_for_json(&url, request).await?;
        extract_task_id(&body).ok_or(ClientError::MissingTaskId)
    }

    async fn fetch_task(&self, task_id: &str) -> Result<Value, ClientError> {
        let url = self.endpoint(&Self::task_path(task_id));
        let mut request = self.http.get(url.as_str());
        if let Some(timeout) = self.poll_timeout {
            request = request.timeout(timeout);
        }

        let body = self.send_for_json(&url, request).await?;
        if !body.is_object() {
            return Err(ClientError::Decode {
                message: "task status is not a JSON object".to_string(),
            });
        }
        Ok(body)
    }

    async fn submit_approval(
        &self,
        task_id: &str,
        decision: &ApprovalDecision,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&Self::approve_path(task_id));
        let request = self.http.post(url.as_str()).json(decision);
        self.send_for_status(&url, request).await
    }

    async fn reset(&self) -> Result<(), ClientError> {
        let url = self.endpoint("/reset");
        let request = self.http.post(url.as_str());
        self.send_for_status(&url, request).await
    }

    async fn health(&self) -> Result<(), ClientError> {
        let url = self.endpoint("/health");
        let request = self.http.get(url.as_str()).timeout(self.create_timeout);
        self.send_for_status(&url, request).await
    }
}

fn transport_error(url: &str, error: &reqwest::Error) -> ClientError {
    if error.is_builder() {
        return ClientError::InvalidRequest {
            message: error.to_string(),
        };
    }
    ClientError::Unreachable {
        url: url.to_string(),
        message: error.to_string(),
        timed_out: error.is_timeout(),
    }
}

pub fn format_http_error(status: u16, body: &[u8]) -> ClientError {
    let text = String::from_utf8_lossy(body).trim().to_string();
    let body = if text.is_empty() {
        "<empty>".to_string()
    } else {
        text
    };
    ClientError::Http { status, body }
}

async fn decode_json_response(url: &str, response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| transport_error(url, &error))?;

    if !status.is_success() {
        return Err(format_http_error(status.as_u16(), &bytes));
    }

    serde_json::from_slice::<Value>(&bytes).map_err(|error| ClientError::Decode {
        message: error.to_string(),
    })
}
