//! Error types for the task lifecycle.

use thiserror::Error;

use crate::client::ClientError;

/// Task creation failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    /// The worker could not be reached and the offline simulation is
    /// disabled.
    #[error("worker unreachable: {0}")]
    Unreachable(#[source] ClientError),

    /// A reachable worker refused or garbled the request.
    #[error("worker rejected task creation: {0}")]
    Rejected(#[source] ClientError),
}

/// An approval decision could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("no active task to approve")]
    NoActiveTask,

    #[error("failed to submit approval: {0}")]
    Submission(#[source] ClientError),
}
