//! Error types for calls against the worker's task API.

use thiserror::Error;

/// Errors returned by a [`TaskApi`](super::TaskApi) call.
///
/// The variants split into two classes. Connectivity-class errors mean the
/// worker could not be reached at all; everything else means a reachable
/// worker answered badly, or the request could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No base URL is configured.
    #[error("worker base URL is missing")]
    BaseUrlMissing,

    /// Timeout, refused connection, DNS or transport failure.
    #[error("worker unreachable at {url}: {message}")]
    Unreachable {
        url: String,
        message: String,
        timed_out: bool,
    },

    /// The request could not be constructed.
    #[error("invalid worker request: {message}")]
    InvalidRequest { message: String },

    /// The worker answered with a non-success status.
    #[error("worker returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The worker's body is not the JSON shape expected.
    #[error("malformed worker response: {message}")]
    Decode { message: String },

    /// The create response carries none of the task identifier fields.
    #[error("worker response is missing a task identifier")]
    MissingTaskId,
}

impl ClientError {
    /// Whether this error means the worker was unreachable.
    ///
    /// Only connectivity-class errors may lead to the offline simulation.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Unreachable { timed_out: true, .. })
    }
}
