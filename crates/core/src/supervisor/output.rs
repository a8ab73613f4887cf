//! Bounded buffer of captured worker output.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use osae_protocol::worker_models::{OutputLine, OutputStream};
use tokio::sync::Mutex;

/// Keeps the most recent lines from both output streams.
///
/// Oldest lines are dropped once `capacity` is reached. Cloning shares the
/// underlying buffer.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: Arc<Mutex<VecDeque<OutputLine>>>,
    capacity: usize,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    pub async fn push(&self, stream: OutputStream, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock().await;
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(OutputLine {
            stream,
            line,
            at: Utc::now(),
        });
    }

    /// Copy of the buffered lines, oldest first.
    pub async fn snapshot(&self) -> Vec<OutputLine> {
        self.lines.lock().await.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.lines.lock().await.clear();
    }
}
