//! Task Orchestrator: drives the single active task.
//!
//! The orchestrator creates tasks through a [`TaskApi`], runs one cancellable
//! poll loop for the active task, applies responses through the task state
//! machine and forwards every change to the panel over the
//! [`UiSyncChannel`].
//!
//! Creation failures are classified: only connectivity-class errors can lead
//! to the offline simulation, and only under
//! [`FallbackPolicy::Simulate`].

pub mod error;
mod poll;

pub use error::{ApprovalError, CreateError};

use std::sync::Arc;

use osae_protocol::config_models::{FallbackPolicy, TaskSettings};
use osae_protocol::ipc::OutboundMessage;
use osae_protocol::task_models::{ApprovalDecision, Task, TaskOrigin};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use self::poll::PollHandle;
use crate::channel::UiSyncChannel;
use crate::client::{ClientError, TaskApi};
use crate::simulation::simulated_task_id;
use crate::state::task::create_task;

/// The outcome of a successful `start_task`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedTask {
    pub task_id: String,
    /// Progress comes from the offline simulation.
    pub simulated: bool,
}

#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) task: Option<Task>,
    pub(crate) poll: Option<PollHandle>,
}

pub(crate) struct Shared {
    pub(crate) client: Arc<dyn TaskApi>,
    pub(crate) channel: UiSyncChannel,
    pub(crate) settings: TaskSettings,
    pub(crate) inner: Mutex<Inner>,
}

/// Drives the task lifecycle against the worker.
pub struct TaskOrchestrator {
    shared: Arc<Shared>,
    /// Serializes start and reset so two loops never overlap.
    lifecycle: Mutex<()>,
}

impl TaskOrchestrator {
    pub fn new(client: Arc<dyn TaskApi>, channel: UiSyncChannel, settings: TaskSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                channel,
                settings,
                inner: Mutex::new(Inner::default()),
            }),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &TaskSettings {
        &self.shared.settings
    }

    /// Start a new task, superseding the active one.
    ///
    /// The active poll loop is cancelled before the create request is sent.
    /// On success a `task_started` message is sent and polling begins one
    /// interval later.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The user's request
    ///
    /// # Returns
    ///
    /// The new task id, and whether the run is simulated.
    ///
    /// # Errors
    ///
    /// - `CreateError::Unreachable` if the worker cannot be reached and the
    ///   fallback policy is `FailLoud`
    /// - `CreateError::Rejected` if the worker answered with an error or a
    ///   body without a task id; a fatal `task_error` is also sent
    pub async fn start_task(&self, prompt: &str) -> Result<StartedTask, CreateError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.cancel_active("superseded by a new task").await;

        match self.shared.client.create_task(prompt).await {
            Ok(task_id) => {
                info!(%task_id, "task created");
                Ok(self.begin(task_id, TaskOrigin::Worker).await)
            }
            Err(error) if error.is_connectivity() => match self.shared.settings.offline_fallback {
                FallbackPolicy::Simulate => {
                    warn!(%error, "worker unreachable, running offline simulation");
                    Ok(self.begin(simulated_task_id(), TaskOrigin::Simulated).await)
                }
                FallbackPolicy::FailLoud => {
                    error!(%error, "worker unreachable, task not started");
                    self.shared.channel.send(OutboundMessage::TaskError {
                        message: error.to_string(),
                        fatal: false,
                    });
                    Err(CreateError::Unreachable(error))
                }
            },
            Err(error) => {
                error!(%error, "worker rejected task creation");
                self.shared.channel.send(OutboundMessage::TaskError {
                    message: error.to_string(),
                    fatal: true,
                });
                Err(CreateError::Rejected(error))
            }
        }
    }

    async fn begin(&self, task_id: String, origin: TaskOrigin) -> StartedTask {
        let handle = PollHandle::new(task_id.clone());
        {
            let mut inner = self.shared.inner.lock().await;
            inner.task = Some(create_task(task_id.clone(), origin));
            inner.poll = Some(handle.clone());
        }

        let simulated = origin == TaskOrigin::Simulated;
        self.shared.channel.send(OutboundMessage::TaskStarted {
            task_id: task_id.clone(),
            simulated,
        });

        let shared = Arc::clone(&self.shared);
        if simulated {
            tokio::spawn(poll::run_simulation(shared, handle));
        } else {
            tokio::spawn(poll::poll_worker(shared, handle));
        }

        StartedTask { task_id, simulated }
    }

    /// Cancel the active poll loop and forget the active task.
    async fn cancel_active(&self, reason: &str) {
        let mut inner = self.shared.inner.lock().await;
        if let Some(poll) = inner.poll.take() {
            poll.token.cancel();
            info!(task_id = %poll.task_id, reason, "poll loop cancelled");
        }
        inner.task = None;
    }

    /// Post an approval decision for a task.
    ///
    /// Local task state is left untouched: the next poll decides whether the
    /// pause has lifted. The outcome is reported to the panel as
    /// `approval:approved`, `approval:rejected` or `approval:error`.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Submission` if the decision could not be
    /// delivered.
    pub async fn submit_approval(
        &self,
        task_id: &str,
        decision: ApprovalDecision,
    ) -> Result<(), ApprovalError> {
        match self.shared.client.submit_approval(task_id, &decision).await {
            Ok(()) => {
                info!(task_id, approved = decision.approved, "approval decision submitted");
                let task_id = task_id.to_string();
                self.shared.channel.send(if decision.approved {
                    OutboundMessage::ApprovalApproved { task_id }
                } else {
                    OutboundMessage::ApprovalRejected {
                        task_id,
                        feedback: decision.feedback,
                    }
                });
                Ok(())
            }
            Err(error) => {
                warn!(task_id, %error, "approval submission failed");
                self.shared.channel.send(OutboundMessage::ApprovalError {
                    task_id: Some(task_id.to_string()),
                    message: error.to_string(),
                });
                Err(ApprovalError::Submission(error))
            }
        }
    }

    /// Post an approval decision for the active task.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::NoActiveTask` if no task is active, or
    /// `ApprovalError::Submission` if the decision could not be delivered.
    pub async fn submit_active_approval(
        &self,
        decision: ApprovalDecision,
    ) -> Result<(), ApprovalError> {
        let Some(task_id) = self.active_task_id().await else {
            let error = ApprovalError::NoActiveTask;
            warn!("approval decision without an active task");
            self.shared.channel.send(OutboundMessage::ApprovalError {
                task_id: None,
                message: error.to_string(),
            });
            return Err(error);
        };
        self.submit_approval(&task_id, decision).await
    }

    /// Clear all task state, on the worker and locally.
    ///
    /// The panel is told to refresh even if the worker could not be reached.
    ///
    /// # Errors
    ///
    /// Returns the `ClientError` from `POST /reset`.
    pub async fn reset(&self) -> Result<(), ClientError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.cancel_active("reset").await;

        let result = self.shared.client.reset().await;
        match &result {
            Ok(()) => info!("worker task state reset"),
            Err(error) => warn!(%error, "worker reset failed, local state cleared anyway"),
        }

        self.shared.channel.send(OutboundMessage::PanelRefresh);
        result
    }

    /// Stop polling and forget the active task without calling the worker.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.cancel_active("shutdown").await;
    }

    /// Copy of the active task.
    pub async fn current_task(&self) -> Option<Task> {
        self.shared.inner.lock().await.task.clone()
    }

    pub async fn active_task_id(&self) -> Option<String> {
        self.shared
            .inner
            .lock()
            .await
            .task
            .as_ref()
            .map(|task| task.id.clone())
    }

    /// Whether a poll loop is serving the active task.
    pub async fn is_polling(&self) -> bool {
        self.shared.inner.lock().await.poll.is_some()
    }
}
