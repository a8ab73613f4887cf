//! Worker process models.
//!
//! The worker is the long-lived agent runtime the control surface launches
//! and reaches over its loopback HTTP API. These types describe its lifecycle
//! and the diagnostics captured from its output streams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ts_rs::TS;

/// Lifecycle state of the worker process.
///
/// NotStarted -> Starting -> Running -> Exited
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkerState {
    /// No launch has been attempted.
    NotStarted,

    /// Interpreter resolved, child being spawned.
    Starting,

    /// Child process is alive.
    Running,

    /// Child process ended, on its own or by termination.
    Exited {
        /// Exit code, when the process exited normally.
        code: Option<i32>,
        /// Terminating signal on unix.
        signal: Option<i32>,
    },
}

impl WorkerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn has_exited(&self) -> bool {
        matches!(self, Self::Exited { .. })
    }
}

/// Output stream a captured line came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of worker output, kept for diagnostics only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
    pub at: DateTime<Utc>,
}

/// A launched worker process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct WorkerProcess {
    /// OS process id, if the platform reported one.
    pub pid: Option<u32>,

    /// Interpreter the worker runs under.
    pub interpreter: PathBuf,

    /// Entrypoint script passed to the interpreter.
    pub entrypoint: PathBuf,

    /// State at the time this value was taken.
    pub state: WorkerState,
}
