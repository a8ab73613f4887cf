//! Task lifecycle models.
//!
//! This module defines the structures for tracking the single task that the
//! control surface drives against the worker.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Represents the current lifecycle status of a task.
///
/// The status progresses through these states during normal execution:
/// Created -> Running -> Completed
///
/// Special states:
/// - PausedForApproval: the worker's next step is the execution stage and it
///   waits for a human decision
/// - Failed: the worker reported a failure
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has been accepted by the worker but no status was polled yet.
    Created,

    /// Task is actively executing.
    Running,

    /// Task is waiting for an approval decision before executing a
    /// proposed action.
    PausedForApproval,

    /// Task has completed successfully.
    Completed,

    /// Task has failed.
    Failed,
}

impl TaskStatus {
    /// Map a worker-supplied status string onto the lifecycle.
    ///
    /// Returns `None` for values outside the known vocabulary so callers can
    /// keep the last known status.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" | "pending" | "queued" => Some(Self::Created),
            "running" | "in_progress" | "active" | "working" | "started" | "resuming" => {
                Some(Self::Running)
            }
            "completed" | "complete" | "done" | "finished" | "success" | "succeeded" => {
                Some(Self::Completed)
            }
            "failed" | "failure" | "error" | "errored" | "cancelled" | "canceled" => {
                Some(Self::Failed)
            }
            _ => None,
        }
    }

    /// Whether this status ends the task.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Wire name used in UI payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::PausedForApproval => "paused_for_approval",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Where a task's progress comes from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrigin {
    /// Progress is polled from the worker's task API.
    Worker,

    /// Progress is generated locally because the worker was unreachable.
    Simulated,
}

/// Represents the client-side view of the active task.
///
/// Exactly one task is active at a time. It is created by a user-initiated
/// start action and mutated only by poll responses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Task {
    /// Opaque identifier issued by the worker.
    pub id: String,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// Whether the progress is real or simulated.
    pub origin: TaskOrigin,

    /// Ordered plan step descriptions.
    pub plan: Vec<String>,

    /// Zero-based index of the step being executed.
    ///
    /// Never exceeds `plan.len()`.
    pub current_step_index: usize,

    /// Artifacts produced so far (code files, markdown, diffs).
    ///
    /// Kept opaque; rendering is the panel's concern.
    #[ts(type = "Array<unknown>")]
    pub artifacts: Vec<serde_json::Value>,

    /// Latest reasoning trace reported by the worker.
    pub thought_trace: Option<String>,

    /// Model currently driving the worker.
    pub active_model: Option<String>,

    /// Last known "next step" indicator.
    pub next: Option<String>,

    /// Action awaiting approval, if any.
    pub proposed_action: Option<String>,

    /// The worker is retrying a failed step.
    pub is_retrying: bool,

    /// The worker is reflecting on its progress.
    pub is_reflecting: bool,

    /// Failure reported by the worker.
    pub error: Option<String>,
}

impl Task {
    /// Whether the approval gate is currently active.
    pub fn awaiting_approval(&self) -> bool {
        self.status == TaskStatus::PausedForApproval
    }
}

/// A human decision on a proposed action.
///
/// Constructed on user action and consumed by a single API call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ApprovalDecision {
    /// Whether the proposed action may run.
    pub approved: bool,

    /// Free-text guidance, expected when rejecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ApprovalDecision {
    /// Approve the proposed action.
    pub fn approve() -> Self {
        Self {
            approved: true,
            feedback: None,
        }
    }

    /// Reject the proposed action with optional feedback.
    pub fn reject(feedback: Option<String>) -> Self {
        Self {
            approved: false,
            feedback: feedback.filter(|text| !text.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_vocabulary() {
        assert_eq!(TaskStatus::from_wire("running"), Some(TaskStatus::Running));
        assert_eq!(TaskStatus::from_wire(" Completed "), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::from_wire("done"), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::from_wire("ERROR"), Some(TaskStatus::Failed));
        assert_eq!(TaskStatus::from_wire("thinking"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::PausedForApproval.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_reject_drops_blank_feedback() {
        assert_eq!(ApprovalDecision::reject(Some("  ".to_string())).feedback, None);
        assert_eq!(
            ApprovalDecision::reject(Some("use b.txt".to_string())).feedback.as_deref(),
            Some("use b.txt")
        );
    }

    #[test]
    fn test_approval_wire_shape() {
        let json = serde_json::to_value(ApprovalDecision::approve()).unwrap();
        assert_eq!(json, serde_json::json!({"approved": true}));
    }
}
