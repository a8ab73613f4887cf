//! # osae-core
//!
//! Worker supervision, task orchestration and UI synchronization for the
//! OSAE control surface.
//!
//! This crate provides:
//! - Configuration loading from the `.osae/` directory
//! - Supervision of the external worker process
//! - The HTTP task client and response normalization
//! - The task state machine, poll loop and approval gate
//! - The offline simulation fallback
//! - The message channel to the embedded panel
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`supervisor`]: Worker process lifecycle
//! - [`client`]: Task API trait, HTTP client and normalization
//! - [`state`]: Task state transitions
//! - [`orchestrator`]: Task lifecycle driver
//! - [`simulation`]: Network-free progress generator
//! - [`channel`]: Panel message bus
//! - [`session`]: Composition root

pub mod channel;
pub mod client;
pub mod config;
pub mod orchestrator;
pub mod session;
pub mod simulation;
pub mod state;
pub mod supervisor;

pub use channel::UiSyncChannel;
pub use orchestrator::{StartedTask, TaskOrchestrator};
pub use session::{ActivationError, ControlSession};
pub use supervisor::WorkerSupervisor;
