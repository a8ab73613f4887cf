//! Normalization of worker task responses.
//!
//! The worker is untyped and inconsistent about field names: the same fact
//! can arrive under several keys, at the top level or inside a nested
//! `state` object. Every synonym set is listed here once, and every consumer
//! reads worker payloads through [`TaskUpdate::from_value`] or
//! [`extract_task_id`].
//!
//! A field that is absent from a response stays `None` in the update, so
//! callers can keep the last known value.

use osae_protocol::task_models::TaskStatus;
use serde_json::{Map, Value};

/// Keys that may carry the task identifier in a create response.
pub const TASK_ID_KEYS: &[&str] = &["task_id", "id", "taskId"];

/// Keys that may carry the task status.
///
/// `state` only counts when it holds a string; an object under `state` is
/// the nested envelope and is flattened instead.
pub const STATUS_KEYS: &[&str] = &["task_status", "status", "state"];

pub const STEP_INDEX_KEYS: &[&str] = &["currentStepIndex", "current_step_index"];
pub const PROPOSED_CALL_KEYS: &[&str] = &["proposedToolCall", "proposed_tool_call"];
pub const THOUGHT_TRACE_KEYS: &[&str] = &["thought_trace", "thoughtTrace"];
pub const ACTIVE_MODEL_KEYS: &[&str] = &["active_model", "activeModel"];
pub const RETRYING_KEYS: &[&str] = &["is_retrying", "isRetrying", "retrying"];
pub const REFLECTING_KEYS: &[&str] = &["is_reflecting", "isReflecting", "reflecting"];

/// Keys on an artifact that may describe an embedded call.
pub const ARTIFACT_CALL_KEYS: &[&str] = &["tool_call", "toolCall", "call"];

/// Keys on a plan step object that may carry its description.
const PLAN_STEP_KEYS: &[&str] = &["description", "title", "step", "name"];

const NESTED_STATE_KEY: &str = "state";

/// Flatten a worker response into a single-level map.
///
/// Keys from a nested `state` object are lifted to the top level. Top-level
/// keys win on conflict unless they are null. Non-object input yields an
/// empty map.
pub fn flatten(raw: &Value) -> Map<String, Value> {
    let Some(object) = raw.as_object() else {
        return Map::new();
    };

    let mut flat = object.clone();
    if let Some(Value::Object(nested)) = object.get(NESTED_STATE_KEY) {
        flat.remove(NESTED_STATE_KEY);
        for (key, value) in nested {
            if flat.get(key).map_or(true, Value::is_null) {
                flat.insert(key.clone(), value.clone());
            }
        }
    }
    flat
}

/// Read the task identifier from a create response.
///
/// Numeric identifiers are accepted and rendered as strings.
pub fn extract_task_id(raw: &Value) -> Option<String> {
    let object = raw.as_object()?;
    TASK_ID_KEYS.iter().find_map(|key| match object.get(*key) {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// A partial, normalized view of one task status response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub plan: Option<Vec<String>>,
    pub current_step_index: Option<usize>,
    pub artifacts: Option<Vec<Value>>,
    /// `next` joined into one string when the worker sent a list.
    pub next: Option<String>,
    pub proposed_action: Option<String>,
    pub thought_trace: Option<String>,
    pub active_model: Option<String>,
    pub is_retrying: Option<bool>,
    pub is_reflecting: Option<bool>,
    pub error: Option<String>,
    /// The flattened response, forwarded to the panel as-is.
    pub raw: Map<String, Value>,
}

impl TaskUpdate {
    /// Normalize a raw `GET /task/{id}` response.
    pub fn from_value(raw: &Value) -> Self {
        let flat = flatten(raw);

        let error = string_at(&flat, &["error"]);
        let artifacts = flat.get("artifacts").and_then(Value::as_array).cloned();

        Self {
            status: status_of(&flat, error.is_some()),
            plan: flat.get("plan").and_then(plan_steps),
            current_step_index: first(&flat, STEP_INDEX_KEYS)
                .and_then(Value::as_u64)
                .and_then(|index| usize::try_from(index).ok()),
            next: flat.get("next").and_then(join_next),
            proposed_action: proposed_action(&flat, artifacts.as_deref()),
            thought_trace: string_at(&flat, THOUGHT_TRACE_KEYS),
            active_model: string_at(&flat, ACTIVE_MODEL_KEYS),
            is_retrying: first(&flat, RETRYING_KEYS).and_then(Value::as_bool),
            is_reflecting: first(&flat, REFLECTING_KEYS).and_then(Value::as_bool),
            artifacts,
            error,
            raw: flat,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(TaskStatus::is_terminal)
    }
}

fn first<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key).filter(|value| !value.is_null()))
}

fn string_at(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

/// A terminal value under any synonym wins over a non-terminal one, then an
/// error marks failure, then `done: true` marks completion.
fn status_of(map: &Map<String, Value>, has_error: bool) -> Option<TaskStatus> {
    let reported: Vec<TaskStatus> = STATUS_KEYS
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .filter_map(TaskStatus::from_wire)
        .collect();

    if let Some(terminal) = reported.iter().copied().find(|status| status.is_terminal()) {
        return Some(terminal);
    }
    if has_error {
        return Some(TaskStatus::Failed);
    }
    if map.get("done").and_then(Value::as_bool) == Some(true) {
        return Some(TaskStatus::Completed);
    }
    reported.first().copied()
}

fn plan_steps(value: &Value) -> Option<Vec<String>> {
    let steps = match value {
        Value::Array(steps) => steps,
        Value::Object(plan) => plan.get("steps")?.as_array()?,
        _ => return None,
    };

    Some(
        steps
            .iter()
            .filter_map(|step| match step {
                Value::String(text) => Some(text.clone()),
                Value::Object(step) => PLAN_STEP_KEYS
                    .iter()
                    .find_map(|key| step.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
                _ => None,
            })
            .collect(),
    )
}

fn join_next(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

/// Dedicated field first, then the first artifact's embedded call, then the
/// first entry of the worker's own `tool_calls` list.
fn proposed_action(map: &Map<String, Value>, artifacts: Option<&[Value]>) -> Option<String> {
    if let Some(action) = first(map, PROPOSED_CALL_KEYS).and_then(describe_call) {
        return Some(action);
    }

    let from_artifact = artifacts
        .and_then(<[Value]>::first)
        .and_then(Value::as_object)
        .and_then(|artifact| first(artifact, ARTIFACT_CALL_KEYS))
        .and_then(describe_call);
    if from_artifact.is_some() {
        return from_artifact;
    }

    map.get("tool_calls")
        .and_then(Value::as_array)
        .and_then(|calls| calls.first())
        .and_then(describe_call)
}

/// Render a call as `name(args)`. Strings are taken verbatim.
fn describe_call(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Object(call) => {
            let name = call.get("name").and_then(Value::as_str)?;
            let args = ["args", "arguments"]
                .iter()
                .find_map(|key| call.get(*key))
                .map(render_args)
                .unwrap_or_default();
            Some(format!("{name}({args})"))
        }
        _ => None,
    }
}

fn render_args(args: &Value) -> String {
    match args {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(render_args).collect::<Vec<_>>().join(", "),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| format!("{key}={}", render_args(value)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_each_status_synonym_is_read() {
        for key in STATUS_KEYS {
            let mut raw = Map::new();
            raw.insert(key.to_string(), json!("completed"));
            let update = TaskUpdate::from_value(&Value::Object(raw));
            assert_eq!(update.status, Some(TaskStatus::Completed), "key {key}");
            assert!(update.is_terminal());
        }
    }

    #[test]
    fn test_terminal_synonym_beats_running() {
        let update = TaskUpdate::from_value(&json!({
            "status": "running",
            "task_status": "completed"
        }));
        assert_eq!(update.status, Some(TaskStatus::Completed));
    }

    #[test]
    fn test_unknown_status_is_ignored() {
        let update = TaskUpdate::from_value(&json!({"status": "thinking"}));
        assert_eq!(update.status, None);
    }

    #[test]
    fn test_nested_state_is_flattened() {
        let raw = json!({
            "id": "abc123",
            "state": {
                "plan": ["Read file", "Write file"],
                "current_step_index": 1,
                "done": false,
                "error": null
            },
            "next": ["executor"]
        });
        let update = TaskUpdate::from_value(&raw);

        assert_eq!(
            update.plan,
            Some(vec!["Read file".to_string(), "Write file".to_string()])
        );
        assert_eq!(update.current_step_index, Some(1));
        assert_eq!(update.next.as_deref(), Some("executor"));
        assert_eq!(update.status, None);
        assert!(!update.raw.contains_key("state"));
    }

    #[test]
    fn test_top_level_keys_win_over_nested_state() {
        let flat = flatten(&json!({"plan": ["top"], "state": {"plan": ["nested"]}}));
        assert_eq!(flat.get("plan"), Some(&json!(["top"])));

        let crashed = TaskUpdate::from_value(&json!({"error": null, "state": {"error": "boom"}}));
        assert_eq!(crashed.status, Some(TaskStatus::Failed));
        assert_eq!(crashed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_done_and_error_markers() {
        let done = TaskUpdate::from_value(&json!({"state": {"done": true}}));
        assert_eq!(done.status, Some(TaskStatus::Completed));

        let crashed = TaskUpdate::from_value(&json!({
            "state": {"done": false, "error": "model not found", "traceback": "..."}
        }));
        assert_eq!(crashed.status, Some(TaskStatus::Failed));
        assert_eq!(crashed.error.as_deref(), Some("model not found"));
    }

    #[test]
    fn test_plan_accepts_steps_object() {
        let update = TaskUpdate::from_value(&json!({
            "plan": {"steps": ["one", {"description": "two"}]}
        }));
        assert_eq!(update.plan, Some(vec!["one".to_string(), "two".to_string()]));
    }

    #[test]
    fn test_proposed_action_extraction_order() {
        let dedicated = TaskUpdate::from_value(&json!({
            "proposedToolCall": "write_file(a.txt)",
            "artifacts": [{"tool_call": "delete(b.txt)"}]
        }));
        assert_eq!(dedicated.proposed_action.as_deref(), Some("write_file(a.txt)"));

        let artifact = TaskUpdate::from_value(&json!({
            "artifacts": [{"toolCall": {"name": "write_file", "args": {"path": "a.txt"}}}]
        }));
        assert_eq!(artifact.proposed_action.as_deref(), Some("write_file(path=a.txt)"));

        let tool_calls = TaskUpdate::from_value(&json!({
            "state": {"tool_calls": [{"name": "run", "arguments": ["ls", "-la"]}]}
        }));
        assert_eq!(tool_calls.proposed_action.as_deref(), Some("run(ls, -la)"));

        assert_eq!(TaskUpdate::from_value(&json!({})).proposed_action, None);
    }

    #[test]
    fn test_extract_task_id_synonyms() {
        assert_eq!(extract_task_id(&json!({"task_id": "abc123"})).as_deref(), Some("abc123"));
        assert_eq!(extract_task_id(&json!({"id": "x"})).as_deref(), Some("x"));
        assert_eq!(extract_task_id(&json!({"taskId": 42})).as_deref(), Some("42"));
        assert_eq!(extract_task_id(&json!({"task_id": ""})), None);
        assert_eq!(extract_task_id(&json!({"ok": true})), None);
        assert_eq!(extract_task_id(&json!("abc123")), None);
    }
}
