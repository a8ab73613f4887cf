//! Task state machine implementation.
//!
//! This module provides functions for managing the lifecycle of the active
//! Task. Poll responses are the only input: the worker, not the client, is
//! the source of truth for progress and for whether an approval pause has
//! lifted.

use osae_protocol::task_models::{Task, TaskOrigin, TaskStatus};

use crate::client::normalize::TaskUpdate;

/// Keyword in the worker's `next` indicator that names the execution stage.
pub const EXECUTION_SENTINEL: &str = "executor";

/// Whether a `next` indicator names the execution stage.
///
/// Case-insensitive substring match against [`EXECUTION_SENTINEL`].
pub fn is_execution_pending(next: &str) -> bool {
    next.to_ascii_lowercase().contains(EXECUTION_SENTINEL)
}

/// What an update changed, for the caller to log and react to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub gate_opened: bool,
    pub gate_closed: bool,
    pub became_terminal: bool,
}

/// Create a new Task with Created status.
///
/// # Arguments
///
/// * `id` - The identifier issued by the worker (or generated for a
///   simulated run)
/// * `origin` - Whether progress is polled or simulated
///
/// # Returns
///
/// A Task with an empty plan and no reported fields.
pub fn create_task(id: String, origin: TaskOrigin) -> Task {
    Task {
        id,
        status: TaskStatus::Created,
        origin,
        plan: Vec::new(),
        current_step_index: 0,
        artifacts: Vec::new(),
        thought_trace: None,
        active_model: None,
        next: None,
        proposed_action: None,
        is_retrying: false,
        is_reflecting: false,
        error: None,
    }
}

/// Apply one normalized poll response to the task.
///
/// Fields absent from the update keep their last known value. The status is
/// derived in this order: a terminal status wins; otherwise the task is
/// paused while the last known `next` names the execution stage; otherwise
/// it is running. A terminal task ignores further updates.
///
/// # Arguments
///
/// * `task` - The active task
/// * `update` - The normalized response
///
/// # Returns
///
/// A `Transition` describing gate and terminal changes.
pub fn apply_update(task: &mut Task, update: &TaskUpdate) -> Transition {
    if task.status.is_terminal() {
        return Transition::default();
    }

    let was_paused = task.awaiting_approval();

    if let Some(plan) = &update.plan {
        task.plan = plan.clone();
    }
    if let Some(index) = update.current_step_index {
        task.current_step_index = index;
    }
    task.current_step_index = task.current_step_index.min(task.plan.len());

    if let Some(artifacts) = &update.artifacts {
        task.artifacts = artifacts.clone();
    }
    if let Some(next) = &update.next {
        task.next = Some(next.clone());
    }
    if update.thought_trace.is_some() {
        task.thought_trace = update.thought_trace.clone();
    }
    if update.active_model.is_some() {
        task.active_model = update.active_model.clone();
    }
    if let Some(retrying) = update.is_retrying {
        task.is_retrying = retrying;
    }
    if let Some(reflecting) = update.is_reflecting {
        task.is_reflecting = reflecting;
    }
    if update.error.is_some() {
        task.error = update.error.clone();
    }

    let gate_active = task.next.as_deref().is_some_and(is_execution_pending);

    task.status = match update.status {
        Some(status) if status.is_terminal() => status,
        _ if gate_active => TaskStatus::PausedForApproval,
        _ => TaskStatus::Running,
    };

    task.proposed_action = if task.awaiting_approval() {
        update
            .proposed_action
            .clone()
            .or_else(|| task.proposed_action.take())
    } else {
        None
    };

    let paused = task.awaiting_approval();
    Transition {
        gate_opened: paused && !was_paused,
        gate_closed: was_paused && !paused,
        became_terminal: task.status.is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(raw: serde_json::Value) -> TaskUpdate {
        TaskUpdate::from_value(&raw)
    }

    #[test]
    fn test_create_task() {
        let task = create_task("abc123".to_string(), TaskOrigin::Worker);
        assert_eq!(task.id, "abc123");
        assert_eq!(task.status, TaskStatus::Created);
        assert!(task.plan.is_empty());
        assert!(!task.awaiting_approval());
    }

    #[test]
    fn test_sentinel_is_case_insensitive_substring() {
        assert!(is_execution_pending("Executor"));
        assert!(is_execution_pending("drafter, EXECUTOR"));
        assert!(!is_execution_pending("Planner"));
        assert!(!is_execution_pending(""));
    }

    #[test]
    fn test_running_update() {
        let mut task = create_task("abc123".to_string(), TaskOrigin::Worker);
        let transition = apply_update(&mut task, &update(json!({"status": "running"})));

        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(transition, Transition::default());
    }

    #[test]
    fn test_gate_opens_and_closes_only_from_next() {
        let mut task = create_task("abc123".to_string(), TaskOrigin::Worker);

        let opened = apply_update(
            &mut task,
            &update(json!({"next": "Executor", "proposedToolCall": "write_file(a.txt)"})),
        );
        assert!(opened.gate_opened);
        assert!(task.awaiting_approval());
        assert_eq!(task.proposed_action.as_deref(), Some("write_file(a.txt)"));

        // A response without `next` keeps the last known indicator.
        let unchanged = apply_update(&mut task, &update(json!({"thought_trace": "waiting"})));
        assert_eq!(unchanged, Transition::default());
        assert!(task.awaiting_approval());
        assert_eq!(task.proposed_action.as_deref(), Some("write_file(a.txt)"));

        let closed = apply_update(&mut task, &update(json!({"next": "Planner"})));
        assert!(closed.gate_closed);
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.proposed_action, None);
    }

    #[test]
    fn test_step_index_is_clamped_to_plan_length() {
        let mut task = create_task("abc123".to_string(), TaskOrigin::Worker);
        apply_update(
            &mut task,
            &update(json!({"plan": ["a", "b"], "currentStepIndex": 7})),
        );
        assert_eq!(task.current_step_index, 2);

        apply_update(&mut task, &update(json!({"plan": ["only"]})));
        assert_eq!(task.current_step_index, 1);
    }

    #[test]
    fn test_terminal_is_sticky() {
        let mut task = create_task("abc123".to_string(), TaskOrigin::Worker);
        let done = apply_update(&mut task, &update(json!({"task_status": "completed"})));
        assert!(done.became_terminal);

        let after = apply_update(&mut task, &update(json!({"status": "running"})));
        assert_eq!(after, Transition::default());
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_terminal_wins_over_pending_execution() {
        let mut task = create_task("abc123".to_string(), TaskOrigin::Worker);
        apply_update(&mut task, &update(json!({"next": "executor"})));

        let failed = apply_update(
            &mut task,
            &update(json!({"state": {"error": "boom"}, "next": ["executor"]})),
        );
        assert!(failed.became_terminal);
        assert!(failed.gate_closed);
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("boom"));
    }
}
