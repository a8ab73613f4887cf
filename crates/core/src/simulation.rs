//! Simulation Fallback: network-free progress for an unreachable worker.
//!
//! The simulation emits payloads shaped like worker poll responses, so they
//! flow through the same normalization and state transitions as real ones.

use std::pin::Pin;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_stream::Stream;

/// The fixed plan every simulated run walks through.
pub const SIMULATED_PLAN: [&str; 3] = [
    "Analyze the request",
    "Draft the changes",
    "Review the result",
];

/// Model label reported by simulated updates.
pub const SIMULATED_MODEL: &str = "simulation";

/// Prefix of generated simulated task identifiers.
pub const SIMULATED_ID_PREFIX: &str = "simulated-";

/// A stream of synthetic task payloads, one per `tick`.
///
/// The first item arrives one tick after polling starts. Each step is
/// reported as running; the final item carries every terminal-status synonym
/// set to `completed`.
pub fn updates(tick: Duration) -> Pin<Box<dyn Stream<Item = Value> + Send>> {
    let stream = async_stream::stream! {
        let plan: Vec<&str> = SIMULATED_PLAN.to_vec();

        for (index, step) in SIMULATED_PLAN.iter().enumerate() {
            tokio::time::sleep(tick).await;
            yield json!({
                "plan": plan,
                "currentStepIndex": index,
                "status": "running",
                "thought_trace": format!("Simulating step {} of {}: {step}", index + 1, plan.len()),
                "active_model": SIMULATED_MODEL,
            });
        }

        tokio::time::sleep(tick).await;
        yield json!({
            "plan": plan,
            "currentStepIndex": plan.len(),
            "task_status": "completed",
            "status": "completed",
            "state": "completed",
            "active_model": SIMULATED_MODEL,
        });
    };

    Box::pin(stream)
}

pub fn simulated_task_id() -> String {
    format!("{SIMULATED_ID_PREFIX}{}", uuid::Uuid::new_v4())
}
