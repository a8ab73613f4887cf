//! # osae-protocol
//!
//! Core protocol definitions and data models for the OSAE control surface.
//!
//! This crate defines all shared data structures used for:
//! - Configuration file parsing (`.osae/config.toml`)
//! - Task and worker process state
//! - Messages exchanged with the embedded UI panel
//!
//! ## Modules
//!
//! - [`config_models`]: Worker and task settings
//! - [`task_models`]: Task lifecycle and approval decisions
//! - [`worker_models`]: Worker process lifecycle and diagnostics
//! - [`ipc`]: Inbound and outbound UI channel messages
//! - [`snapshot`]: Panel-side snapshot reducer
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, serde_json, ts-rs, and chrono
//! - TypeScript generation: All types derive `TS` for the web panel
//! - Independent compilation: No dependencies on other OSAE crates

pub mod config_models;
pub mod ipc;
pub mod snapshot;
pub mod task_models;
pub mod worker_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use ipc::*;
pub use snapshot::*;
pub use task_models::*;
pub use worker_models::*;
