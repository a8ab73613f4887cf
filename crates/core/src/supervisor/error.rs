//! Error types for worker supervision.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent the worker from being launched.
///
/// All of these are fatal for the session: no task functionality is
/// available without a worker.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// A pinned interpreter was configured but does not exist.
    #[error("pinned interpreter not found at {path}")]
    InterpreterMissing { path: PathBuf },

    /// No configured launcher answered `--version`.
    #[error("no usable interpreter found, tried: {tried:?}")]
    NoLauncher { tried: Vec<String> },

    /// The worker entrypoint script does not exist.
    #[error("worker entrypoint not found at {path}")]
    EntrypointMissing { path: PathBuf },

    /// The OS refused to start the process.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// `launch` was called while a worker is alive.
    #[error("worker already running (pid {pid:?})")]
    AlreadyRunning { pid: Option<u32> },
}

/// A reachable worker reported itself unhealthy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("worker health check returned HTTP {status}: {body}")]
    Unhealthy { status: u16, body: String },
}
