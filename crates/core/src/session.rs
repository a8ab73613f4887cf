//! Control session: the composition root for one activation.
//!
//! A session owns the worker supervisor, the task orchestrator and the panel
//! channel. Nothing here is process-global; tests build sessions from parts.

use std::sync::Arc;

use osae_protocol::config_models::ControlConfig;
use osae_protocol::ipc::{InboundMessage, OutboundMessage};
use osae_protocol::task_models::ApprovalDecision;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::channel::UiSyncChannel;
use crate::client::{ClientError, HttpTaskClient, TaskApi};
use crate::orchestrator::TaskOrchestrator;
use crate::supervisor::{LaunchError, WorkerSupervisor};

/// Activation failed; no task commands are available.
#[derive(Error, Debug)]
pub enum ActivationError {
    #[error("cannot reach worker API: {0}")]
    Client(#[from] ClientError),

    #[error("cannot launch worker: {0}")]
    Launch(#[from] LaunchError),
}

/// A running control surface.
pub struct ControlSession {
    supervisor: Arc<WorkerSupervisor>,
    orchestrator: Arc<TaskOrchestrator>,
    channel: UiSyncChannel,
}

impl ControlSession {
    /// Activate the control surface.
    ///
    /// Builds the HTTP client, launches the worker when `autostart` is set
    /// and schedules a diagnostic health probe. The probe does not gate
    /// anything.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `outbound` - Queue the panel reads outbound messages from
    ///
    /// # Errors
    ///
    /// Returns `ActivationError` if the client cannot be built or the worker
    /// cannot be launched. No worker process is left running on error.
    pub async fn activate(
        config: ControlConfig,
        outbound: mpsc::Sender<OutboundMessage>,
    ) -> Result<Self, ActivationError> {
        let client: Arc<dyn TaskApi> = Arc::new(HttpTaskClient::new(&config.worker, &config.tasks)?);
        let supervisor = Arc::new(WorkerSupervisor::new(config.worker.clone()));

        if config.worker.autostart {
            let process = supervisor.launch().await.inspect_err(|error| {
                error!(%error, "activation failed, task commands are unavailable");
            })?;
            info!(pid = ?process.pid, base_url = %config.worker.base_url, "worker launched");
            supervisor.spawn_probe(Arc::clone(&client));
        } else {
            info!(base_url = %config.worker.base_url, "worker autostart disabled");
        }

        let channel = UiSyncChannel::new(outbound);
        let orchestrator = Arc::new(TaskOrchestrator::new(
            client,
            channel.clone(),
            config.tasks,
        ));

        Ok(Self::from_parts(supervisor, orchestrator, channel))
    }

    pub fn from_parts(
        supervisor: Arc<WorkerSupervisor>,
        orchestrator: Arc<TaskOrchestrator>,
        channel: UiSyncChannel,
    ) -> Self {
        Self {
            supervisor,
            orchestrator,
            channel,
        }
    }

    pub fn supervisor(&self) -> &Arc<WorkerSupervisor> {
        &self.supervisor
    }

    pub fn orchestrator(&self) -> &Arc<TaskOrchestrator> {
        &self.orchestrator
    }

    pub fn channel(&self) -> &UiSyncChannel {
        &self.channel
    }

    /// Route inbound panel messages into the orchestrator.
    ///
    /// Messages are handled one at a time, in arrival order. The returned
    /// task ends when the channel handler is replaced.
    pub fn wire_inbound(&self) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundMessage>();
        self.channel.on_message(move |message| {
            if tx.send(message).is_err() {
                debug!("inbound router stopped");
            }
        });

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                dispatch(&orchestrator, message).await;
            }
        })
    }

    /// Handle one inbound message.
    pub async fn route(&self, message: InboundMessage) {
        dispatch(&self.orchestrator, message).await;
    }

    /// Stop polling and terminate the worker. Idempotent.
    pub async fn shutdown(&self) {
        self.orchestrator.stop().await;
        self.supervisor.terminate().await;
    }
}

/// Failures are already logged and reported to the panel by the
/// orchestrator.
async fn dispatch(orchestrator: &TaskOrchestrator, message: InboundMessage) {
    debug!(?message, "routing panel message");
    match message {
        InboundMessage::StartTask { prompt } => {
            let _ = orchestrator.start_task(&prompt).await;
        }
        InboundMessage::Approve {
            task_id, feedback, ..
        } => {
            let decision = ApprovalDecision {
                approved: true,
                feedback,
            };
            submit(orchestrator, task_id, decision).await;
        }
        InboundMessage::Reject {
            task_id, feedback, ..
        } => {
            submit(orchestrator, task_id, ApprovalDecision::reject(feedback)).await;
        }
        InboundMessage::Reset => {
            let _ = orchestrator.reset().await;
        }
    }
}

async fn submit(orchestrator: &TaskOrchestrator, task_id: Option<String>, decision: ApprovalDecision) {
    let _ = match task_id {
        Some(task_id) => orchestrator.submit_approval(&task_id, decision).await,
        None => orchestrator.submit_active_approval(decision).await,
    };
}
