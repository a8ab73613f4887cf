//! Panel-side snapshot reducer.
//!
//! The panel never assumes a message is a complete snapshot. Each field is
//! last-known-good: a message that omits a field keeps the displayed value,
//! a message that includes a field replaces it wholesale. Arrays and objects
//! are replaced at the field level, never deep-merged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::ipc::OutboundMessage;

/// Outcome of the most recent approval decision, as reported to the panel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalNotice {
    Approved,
    Rejected { feedback: Option<String> },
    Error { message: String },
}

/// The panel's reconciled view of the active task.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct UiSnapshot {
    /// Task the fields belong to.
    pub task_id: Option<String>,

    /// Set by `task_started`, cleared by the first update.
    pub just_started: bool,

    /// The task runs on the offline simulation.
    pub simulated: bool,

    /// Merged task fields.
    #[ts(type = "Record<string, unknown>")]
    pub fields: Map<String, Value>,

    /// Last approval outcome for the current task.
    pub approval_notice: Option<ApprovalNotice>,

    /// Last task creation failure.
    pub error: Option<String>,
}

impl UiSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a partial payload with replace-if-present semantics.
    ///
    /// Non-object payloads are ignored.
    pub fn merge(&mut self, payload: &Value) {
        if let Some(object) = payload.as_object() {
            self.merge_map(object);
        }
    }

    fn merge_map(&mut self, object: &Map<String, Value>) {
        for (key, value) in object {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Reduce one outbound message into the snapshot.
    pub fn apply(&mut self, message: &OutboundMessage) {
        match message {
            OutboundMessage::TaskStarted { task_id, simulated } => {
                *self = Self {
                    task_id: Some(task_id.clone()),
                    just_started: true,
                    simulated: *simulated,
                    ..Self::default()
                };
            }
            OutboundMessage::TaskUpdate { task_id, data } => {
                if self.task_id.as_deref().is_some_and(|current| current != task_id) {
                    return;
                }
                self.task_id = Some(task_id.clone());
                self.just_started = false;
                self.merge_map(data);
            }
            OutboundMessage::TaskError { message, .. } => {
                self.error = Some(message.clone());
            }
            OutboundMessage::ApprovalApproved { task_id } => {
                if self.is_current(task_id) {
                    self.approval_notice = Some(ApprovalNotice::Approved);
                }
            }
            OutboundMessage::ApprovalRejected { task_id, feedback } => {
                if self.is_current(task_id) {
                    self.approval_notice = Some(ApprovalNotice::Rejected {
                        feedback: feedback.clone(),
                    });
                }
            }
            OutboundMessage::ApprovalError { message, .. } => {
                self.approval_notice = Some(ApprovalNotice::Error {
                    message: message.clone(),
                });
            }
            OutboundMessage::PanelRefresh => *self = Self::default(),
        }
    }

    fn is_current(&self, task_id: &str) -> bool {
        self.task_id.as_deref() == Some(task_id)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn status(&self) -> Option<&str> {
        self.get("status").and_then(Value::as_str)
    }

    pub fn plan(&self) -> Vec<&str> {
        self.get("plan")
            .and_then(Value::as_array)
            .map(|steps| steps.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn current_step_index(&self) -> Option<u64> {
        self.get("currentStepIndex").and_then(Value::as_u64)
    }

    pub fn awaiting_approval(&self) -> bool {
        self.get("awaitingApproval")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn proposed_action(&self) -> Option<&str> {
        self.get("proposedAction").and_then(Value::as_str)
    }

    pub fn thought_trace(&self) -> Option<&str> {
        self.get("thoughtTrace").and_then(Value::as_str)
    }

    /// Whether the merged status is completed or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status(), Some("completed") | Some("failed"))
    }
}
