//! State management for the active task.
//!
//! This module provides the task state machine logic driven by poll
//! responses.

pub mod task;
