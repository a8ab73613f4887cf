//! Configuration loading and management.
//!
//! This module loads and validates `.osae/config.toml`. The data model lives
//! in `osae_protocol::config_models`.

pub mod error;
pub mod loader;
