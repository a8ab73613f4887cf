//! Poll loops driving the active task.
//!
//! Each loop is bound to one task id through a [`PollHandle`]. A response is
//! applied only while the active handle still serves that id.

use std::sync::Arc;

use osae_protocol::ipc::OutboundMessage;
use osae_protocol::task_models::Task;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Shared;
use crate::client::normalize::TaskUpdate;
use crate::client::ClientError;
use crate::simulation;
use crate::state::task::apply_update;

/// Cancellable handle for the poll loop serving one task.
#[derive(Debug, Clone)]
pub(crate) struct PollHandle {
    pub(crate) task_id: String,
    pub(crate) token: CancellationToken,
}

impl PollHandle {
    pub(crate) fn new(task_id: String) -> Self {
        Self {
            task_id,
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn serves(&self, task_id: &str) -> bool {
        self.task_id == task_id && !self.token.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Continue,
    Terminal,
    Superseded,
}

/// Poll the worker on a fixed interval until the task ends or is replaced.
///
/// At most one fetch is outstanding. Ticks keep their schedule while a slow
/// fetch is pending and are skipped until it answers, so a hung worker costs
/// one request, not one per tick. Failed polls are logged and retried on the
/// next tick.
pub(crate) async fn poll_worker(shared: Arc<Shared>, handle: PollHandle) {
    let period = shared.settings.poll_interval();
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (results_tx, mut results) = mpsc::unbounded_channel::<Result<Value, ClientError>>();
    let mut in_flight = false;
    let mut sent: u64 = 0;
    let mut skipped: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = handle.token.cancelled() => break,
            Some(result) = results.recv() => {
                in_flight = false;
                match result {
                    Ok(raw) => {
                        if shared.apply(&handle.task_id, &raw).await != Applied::Continue {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(task_id = %handle.task_id, %error, "poll failed, retrying on next tick")
                    }
                }
            }
            _ = ticks.tick() => {
                if in_flight {
                    skipped += 1;
                    debug!(task_id = %handle.task_id, skipped, "previous poll still pending, skipping tick");
                } else {
                    in_flight = true;
                    sent += 1;
                    spawn_fetch(&shared, &handle, results_tx.clone());
                }
            }
        }
    }

    debug!(task_id = %handle.task_id, polls = sent, skipped, "poll loop stopped");
}

fn spawn_fetch(
    shared: &Arc<Shared>,
    handle: &PollHandle,
    results: mpsc::UnboundedSender<Result<Value, ClientError>>,
) {
    let client = Arc::clone(&shared.client);
    let task_id = handle.task_id.clone();
    let token = handle.token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = client.fetch_task(&task_id) => {
                let _ = results.send(result);
            }
        }
    });
}

/// Feed simulated payloads through the same apply path as worker polls.
pub(crate) async fn run_simulation(shared: Arc<Shared>, handle: PollHandle) {
    let mut updates = simulation::updates(shared.settings.simulation_tick());

    loop {
        tokio::select! {
            biased;
            _ = handle.token.cancelled() => break,
            next = updates.next() => {
                let Some(raw) = next else { break };
                if shared.apply(&handle.task_id, &raw).await != Applied::Continue {
                    break;
                }
            }
        }
    }

    debug!(task_id = %handle.task_id, "simulation stopped");
}

impl Shared {
    /// Apply one raw response to the active task and forward it to the
    /// panel.
    ///
    /// A terminal response cancels the poll handle exactly once.
    pub(crate) async fn apply(&self, task_id: &str, raw: &Value) -> Applied {
        let update = TaskUpdate::from_value(raw);

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if !inner.poll.as_ref().is_some_and(|poll| poll.serves(task_id)) {
            debug!(task_id, "discarding response for superseded task");
            return Applied::Superseded;
        }
        let Some(task) = inner.task.as_mut().filter(|task| task.id == task_id) else {
            debug!(task_id, "discarding response for cleared task");
            return Applied::Superseded;
        };

        let transition = apply_update(task, &update);
        if transition.gate_opened {
            info!(task_id, action = ?task.proposed_action, "awaiting approval");
        }
        if transition.gate_closed {
            info!(task_id, "approval gate cleared");
        }

        self.channel.send(OutboundMessage::TaskUpdate {
            task_id: task_id.to_string(),
            data: panel_payload(task, &update),
        });

        if transition.became_terminal {
            if let Some(poll) = inner.poll.take() {
                poll.token.cancel();
            }
            info!(task_id, status = task.status.as_str(), "task finished");
            return Applied::Terminal;
        }

        Applied::Continue
    }
}

/// The flattened response plus canonical fields.
///
/// Canonical keys are included only when the response reported them, so the
/// panel keeps its last known values. Status and the approval fields are
/// always present.
pub(crate) fn panel_payload(task: &Task, update: &TaskUpdate) -> Map<String, Value> {
    let mut data = update.raw.clone();

    data.insert("status".to_string(), json!(task.status.as_str()));
    data.insert("awaitingApproval".to_string(), json!(task.awaiting_approval()));
    data.insert("proposedAction".to_string(), json!(task.proposed_action));

    if update.plan.is_some() {
        data.insert("plan".to_string(), json!(task.plan));
    }
    if update.plan.is_some() || update.current_step_index.is_some() {
        data.insert("currentStepIndex".to_string(), json!(task.current_step_index));
    }
    if update.artifacts.is_some() {
        data.insert("artifacts".to_string(), json!(task.artifacts));
    }
    if update.next.is_some() {
        data.insert("next".to_string(), json!(task.next));
    }
    if update.thought_trace.is_some() {
        data.insert("thoughtTrace".to_string(), json!(task.thought_trace));
    }
    if update.active_model.is_some() {
        data.insert("activeModel".to_string(), json!(task.active_model));
    }
    if update.is_retrying.is_some() {
        data.insert("isRetrying".to_string(), json!(task.is_retrying));
    }
    if update.is_reflecting.is_some() {
        data.insert("isReflecting".to_string(), json!(task.is_reflecting));
    }
    if update.error.is_some() {
        data.insert("error".to_string(), json!(task.error));
    }

    data
}
