//! Task Client: the request layer against the worker's task API.
//!
//! The [`TaskApi`] trait is the seam the orchestrator and supervisor depend
//! on. [`HttpTaskClient`] is the loopback HTTP implementation; tests swap in
//! scripted fakes.

pub mod error;
pub mod http;
pub mod normalize;

pub use error::ClientError;
pub use http::HttpTaskClient;

use async_trait::async_trait;
use osae_protocol::task_models::ApprovalDecision;
use serde_json::Value;

/// Operations the worker exposes for driving a task.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `POST /task`. Returns the issued task identifier.
    async fn create_task(&self, prompt: &str) -> Result<String, ClientError>;

    /// `GET /task/{id}`. Returns the raw, un-normalized response object.
    async fn fetch_task(&self, task_id: &str) -> Result<Value, ClientError>;

    /// `POST /task/{id}/approve`.
    async fn submit_approval(
        &self,
        task_id: &str,
        decision: &ApprovalDecision,
    ) -> Result<(), ClientError>;

    /// `POST /reset`. Clears all server-side task state.
    async fn reset(&self) -> Result<(), ClientError>;

    /// `GET /health`. Succeeds on any 2xx.
    async fn health(&self) -> Result<(), ClientError>;
}
