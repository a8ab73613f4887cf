//! Axum mock of the worker's loopback HTTP API.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A canned HTTP reply.
#[derive(Debug, Clone)]
pub struct CannedReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl CannedReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    #[allow(dead_code)]
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    #[allow(dead_code)]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Shared state behind the mock routes.
pub struct MockWorkerState {
    pub create: Mutex<CannedReply>,
    pub prompts: Mutex<Vec<Value>>,
    /// Per-task replies; the last reply repeats once the queue is down to one.
    pub tasks: Mutex<HashMap<String, VecDeque<Value>>>,
    pub approvals: Mutex<Vec<(String, Value)>>,
    pub resets: AtomicUsize,
    pub health_status: AtomicU16,
}

impl Default for MockWorkerState {
    fn default() -> Self {
        Self {
            create: Mutex::new(CannedReply::json(200, json!({"task_id": "abc123"}))),
            prompts: Mutex::new(Vec::new()),
            tasks: Mutex::new(HashMap::new()),
            approvals: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
            health_status: AtomicU16::new(200),
        }
    }
}

#[allow(dead_code)]
impl MockWorkerState {
    pub fn set_create(&self, reply: CannedReply) {
        *self.create.lock().unwrap() = reply;
    }

    pub fn push_task(&self, task_id: &str, body: Value) {
        self.tasks
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .push_back(body);
    }
}

/// A running mock worker.
pub struct MockWorker {
    pub base_url: String,
    pub state: Arc<MockWorkerState>,
    shutdown: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl MockWorker {
    pub async fn start() -> Self {
        let state = Arc::new(MockWorkerState::default());
        let app = Router::new()
            .route("/task", post(create_task))
            .route("/task/{id}", get(get_task))
            .route("/task/{id}/approve", post(approve))
            .route("/reset", post(reset))
            .route("/health", get(health))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock worker listener");
        let addr = listener.local_addr().expect("mock worker address");
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("run mock worker");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown,
            server,
        }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.server.await;
    }
}

/// A loopback URL nothing listens on.
#[allow(dead_code)]
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("throwaway address");
    drop(listener);
    format!("http://{addr}")
}

fn reply(status: u16, body: String) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn create_task(State(state): State<Arc<MockWorkerState>>, Json(body): Json<Value>) -> Response {
    state.prompts.lock().unwrap().push(body);
    let canned = state.create.lock().unwrap().clone();
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }
    reply(canned.status, canned.body)
}

async fn get_task(State(state): State<Arc<MockWorkerState>>, Path(id): Path<String>) -> Response {
    let mut tasks = state.tasks.lock().unwrap();
    let next = tasks.get_mut(&id).and_then(|queue| {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    });
    match next {
        Some(body) => reply(200, body.to_string()),
        None => reply(404, json!({"detail": "Task not found"}).to_string()),
    }
}

async fn approve(
    State(state): State<Arc<MockWorkerState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let approved = body.get("approved").and_then(Value::as_bool).unwrap_or(false);
    state.approvals.lock().unwrap().push((id, body));
    if approved {
        Json(json!({"status": "resuming"}))
    } else {
        Json(json!({"status": "rejected", "next": ["executor"]}))
    }
}

async fn reset(State(state): State<Arc<MockWorkerState>>) -> Json<Value> {
    state.resets.fetch_add(1, Ordering::SeqCst);
    Json(json!({"status": "ok"}))
}

async fn health(State(state): State<Arc<MockWorkerState>>) -> Response {
    let status = state.health_status.load(Ordering::SeqCst);
    reply(status, json!({"status": "active"}).to_string())
}
