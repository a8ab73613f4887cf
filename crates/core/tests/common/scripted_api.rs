//! In-memory worker API with scripted responses.
//!
//! Responses can be delayed so tests running on paused time can reproduce
//! slow or out-of-order replies deterministically.

use async_trait::async_trait;
use osae_core::client::{ClientError, TaskApi};
use osae_protocol::task_models::ApprovalDecision;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Scripted<T> = (Duration, Result<T, ClientError>);

/// A `TaskApi` whose every answer is scripted up front.
///
/// Unscripted creates succeed with `task-<n>`; unscripted polls answer
/// `{"status": "running"}`.
#[derive(Default)]
pub struct ScriptedApi {
    creates: Mutex<VecDeque<Scripted<String>>>,
    polls: Mutex<HashMap<String, VecDeque<Scripted<Value>>>>,
    fetches: Mutex<HashMap<String, usize>>,
    prompts: Mutex<Vec<String>>,
    approvals: Mutex<Vec<(String, ApprovalDecision)>>,
    approval_failure: Mutex<Option<ClientError>>,
    resets: AtomicUsize,
    health: Mutex<Option<ClientError>>,
}

#[allow(dead_code)]
impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create(self, result: Result<&str, ClientError>) -> Self {
        self.with_create_after(Duration::ZERO, result)
    }

    pub fn with_create_after(self, delay: Duration, result: Result<&str, ClientError>) -> Self {
        self.creates
            .lock()
            .unwrap()
            .push_back((delay, result.map(str::to_string)));
        self
    }

    pub fn with_poll(self, task_id: &str, response: Value) -> Self {
        self.with_poll_after(task_id, Duration::ZERO, Ok(response))
    }

    pub fn with_poll_after(
        self,
        task_id: &str,
        delay: Duration,
        result: Result<Value, ClientError>,
    ) -> Self {
        self.polls
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .push_back((delay, result));
        self
    }

    pub fn with_approval_failure(self, error: ClientError) -> Self {
        *self.approval_failure.lock().unwrap() = Some(error);
        self
    }

    pub fn with_health_failure(self, error: ClientError) -> Self {
        *self.health.lock().unwrap() = Some(error);
        self
    }

    pub fn fetch_count(&self, task_id: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn approvals(&self) -> Vec<(String, ApprovalDecision)> {
        self.approvals.lock().unwrap().clone()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

async fn wait(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl TaskApi for ScriptedApi {
    async fn create_task(&self, prompt: &str) -> Result<String, ClientError> {
        let scripted = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            let count = prompts.len();
            self.creates
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((Duration::ZERO, Ok(format!("task-{count}"))))
        };

        wait(scripted.0).await;
        scripted.1
    }

    async fn fetch_task(&self, task_id: &str) -> Result<Value, ClientError> {
        let scripted = {
            *self
                .fetches
                .lock()
                .unwrap()
                .entry(task_id.to_string())
                .or_default() += 1;
            self.polls
                .lock()
                .unwrap()
                .get_mut(task_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or((Duration::ZERO, Ok(json!({"status": "running"}))))
        };

        wait(scripted.0).await;
        scripted.1
    }

    async fn submit_approval(
        &self,
        task_id: &str,
        decision: &ApprovalDecision,
    ) -> Result<(), ClientError> {
        if let Some(error) = self.approval_failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.approvals
            .lock()
            .unwrap()
            .push((task_id.to_string(), decision.clone()));
        Ok(())
    }

    async fn reset(&self) -> Result<(), ClientError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health(&self) -> Result<(), ClientError> {
        match self.health.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
