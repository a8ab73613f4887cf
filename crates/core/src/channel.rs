//! UI Sync Channel: the message bus to the embedded panel.
//!
//! Outbound delivery is fire-and-forget: a closed or full panel queue drops
//! the message with a debug log. Inbound messages are parsed defensively and
//! handed to whichever handler is wired at the time they arrive.

use std::sync::Arc;
use std::sync::RwLock;

use osae_protocol::ipc::{InboundMessage, OutboundMessage};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Callback for inbound panel messages.
pub type InboundHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Bidirectional channel to the panel.
///
/// Cloning yields another handle to the same channel.
#[derive(Clone)]
pub struct UiSyncChannel {
    outbound: mpsc::Sender<OutboundMessage>,
    handler: Arc<RwLock<Option<InboundHandler>>>,
}

impl UiSyncChannel {
    /// Create a channel that forwards outbound messages into `outbound`.
    pub fn new(outbound: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            outbound,
            handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Send a message to the panel without waiting for it.
    pub fn send(&self, message: OutboundMessage) {
        let kind = message.kind();
        if let Err(error) = self.outbound.try_send(message) {
            debug!(kind, %error, "panel message dropped");
        }
    }

    /// Install the inbound handler, replacing any previous one.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        match self.handler.write() {
            Ok(mut slot) => *slot = Some(Arc::new(handler)),
            Err(poisoned) => *poisoned.into_inner() = Some(Arc::new(handler)),
        }
    }

    /// Deliver one raw inbound message.
    ///
    /// Accepts a `{kind, payload}` envelope or a bare payload.
    ///
    /// # Returns
    ///
    /// `true` if the message was recognized and a handler received it.
    pub fn deliver(&self, raw: &Value) -> bool {
        let Some(message) = InboundMessage::parse(raw) else {
            warn!(%raw, "unrecognized panel message");
            return false;
        };

        let handler = match self.handler.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        match handler {
            Some(handler) => {
                handler(message);
                true
            }
            None => {
                warn!(?message, "no handler wired for panel message");
                false
            }
        }
    }

    /// Deliver one line of JSON text.
    pub fn deliver_str(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(raw) => self.deliver(&raw),
            Err(error) => {
                warn!(%error, "panel message is not JSON");
                false
            }
        }
    }
}
