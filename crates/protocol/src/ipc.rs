//! UI sync channel protocol.
//!
//! This module defines the message types exchanged with the embedded UI
//! panel across the process boundary.
//!
//! The protocol follows an envelope pattern:
//! - `OutboundMessage`: events sent from the control surface to the panel
//! - `InboundMessage`: user actions sent from the panel to the control surface
//!
//! Both directions use a `{kind, payload}` envelope:
//! ```json
//! {
//!   "kind": "task_update",
//!   "payload": {
//!     "task_id": "abc123",
//!     "data": { "plan": ["Read file"], "currentStepIndex": 0 }
//!   }
//! }
//! ```
//!
//! Delivery is best-effort; nothing is acknowledged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

/// Events sent from the control surface to the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "payload")]
pub enum OutboundMessage {
    /// A new task became active.
    #[serde(rename = "task_started")]
    TaskStarted {
        task_id: String,
        /// Progress comes from the offline simulation.
        #[serde(default)]
        simulated: bool,
    },

    /// A partial update for the active task.
    ///
    /// `data` carries only the fields the worker reported in this update,
    /// plus the derived approval fields. The panel merges it field by field.
    #[serde(rename = "task_update")]
    TaskUpdate {
        task_id: String,
        #[ts(type = "Record<string, unknown>")]
        data: Map<String, Value>,
    },

    /// Task creation failed.
    #[serde(rename = "task_error")]
    TaskError {
        message: String,
        /// The panel should block on this notice.
        fatal: bool,
    },

    /// The worker accepted an approval.
    #[serde(rename = "approval:approved")]
    ApprovalApproved { task_id: String },

    /// The worker accepted a rejection.
    #[serde(rename = "approval:rejected")]
    ApprovalRejected {
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },

    /// The approval decision could not be delivered.
    #[serde(rename = "approval:error")]
    ApprovalError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        message: String,
    },

    /// All task state was cleared; the panel should refresh in place.
    #[serde(rename = "osae.refresh")]
    PanelRefresh,
}

impl OutboundMessage {
    /// The envelope `kind` this message serializes under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskStarted { .. } => "task_started",
            Self::TaskUpdate { .. } => "task_update",
            Self::TaskError { .. } => "task_error",
            Self::ApprovalApproved { .. } => "approval:approved",
            Self::ApprovalRejected { .. } => "approval:rejected",
            Self::ApprovalError { .. } => "approval:error",
            Self::PanelRefresh => "osae.refresh",
        }
    }
}

/// User actions sent from the panel to the control surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "payload")]
pub enum InboundMessage {
    /// Start a new task, superseding any active one.
    #[serde(rename = "start_task")]
    StartTask { prompt: String },

    /// Approve the pending action.
    #[serde(rename = "approval:approve")]
    Approve {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },

    /// Reject the pending action.
    #[serde(rename = "approval:reject")]
    Reject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },

    /// Clear all task state on the worker and in the panel.
    #[serde(rename = "osae.reset")]
    Reset,
}

impl InboundMessage {
    /// Parse a message from the panel.
    ///
    /// Accepts either a `{kind, payload}` envelope (`type` and `command` are
    /// accepted in place of `kind`) or a bare payload whose shape identifies
    /// the action. Returns `None` for anything unrecognized.
    pub fn parse(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;

        let kind = ["kind", "type", "command"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str));

        match kind {
            Some(kind) => {
                let payload = object
                    .get("payload")
                    .and_then(Value::as_object)
                    .unwrap_or(object);
                Self::from_kind(kind, payload)
            }
            None => Self::from_bare(object),
        }
    }

    fn from_kind(kind: &str, payload: &Map<String, Value>) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "start_task" | "start-task" | "starttask" => {
                string_field(payload, "prompt").map(|prompt| Self::StartTask { prompt })
            }
            "approval:approve" | "approve" => Some(Self::Approve {
                task_id: task_id_field(payload),
                action: string_field(payload, "action"),
                feedback: string_field(payload, "feedback"),
            }),
            "approval:reject" | "reject" => Some(Self::Reject {
                task_id: task_id_field(payload),
                action: string_field(payload, "action"),
                feedback: string_field(payload, "feedback"),
            }),
            "osae.reset" | "reset" => Some(Self::Reset),
            _ => None,
        }
    }

    fn from_bare(payload: &Map<String, Value>) -> Option<Self> {
        if let Some(approved) = payload.get("approved").and_then(Value::as_bool) {
            let task_id = task_id_field(payload);
            let action = string_field(payload, "action");
            let feedback = string_field(payload, "feedback");
            return Some(if approved {
                Self::Approve {
                    task_id,
                    action,
                    feedback,
                }
            } else {
                Self::Reject {
                    task_id,
                    action,
                    feedback,
                }
            });
        }

        string_field(payload, "prompt").map(|prompt| Self::StartTask { prompt })
    }
}

fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn task_id_field(payload: &Map<String, Value>) -> Option<String> {
    ["task_id", "taskId"]
        .iter()
        .find_map(|key| string_field(payload, key))
}
