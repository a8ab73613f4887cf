//! Custom assertion helpers over panel messages.

use osae_protocol::ipc::OutboundMessage;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;

/// Receive the next panel message, failing the test if none arrives within
/// a generous (paused-clock) deadline.
#[allow(dead_code)]
pub async fn next_message(rx: &mut mpsc::Receiver<OutboundMessage>) -> OutboundMessage {
    match tokio::time::timeout(Duration::from_secs(60), rx.recv()).await {
        Ok(Some(message)) => message,
        Ok(None) => panic!("panel channel closed"),
        Err(_) => panic!("no panel message within 60s"),
    }
}

/// Receive the next `task_update` payload, skipping other messages.
#[allow(dead_code)]
pub async fn next_update(rx: &mut mpsc::Receiver<OutboundMessage>) -> (String, Map<String, Value>) {
    loop {
        if let OutboundMessage::TaskUpdate { task_id, data } = next_message(rx).await {
            return (task_id, data);
        }
    }
}

/// Drain every message already queued.
#[allow(dead_code)]
pub fn drain(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

/// Whether any message is a `task_started`.
#[allow(dead_code)]
pub fn has_task_started(messages: &[OutboundMessage]) -> bool {
    messages
        .iter()
        .any(|message| matches!(message, OutboundMessage::TaskStarted { .. }))
}

/// Count `task_update`s whose canonical status is terminal.
#[allow(dead_code)]
pub fn terminal_update_count(messages: &[OutboundMessage]) -> usize {
    messages
        .iter()
        .filter(|message| match message {
            OutboundMessage::TaskUpdate { data, .. } => matches!(
                data.get("status").and_then(Value::as_str),
                Some("completed") | Some("failed")
            ),
            _ => false,
        })
        .count()
}
