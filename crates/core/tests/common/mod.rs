//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality across all integration tests
//! including:
//! - Test fixtures (configs, orchestrators, throwaway worker scripts)
//! - Custom assertions over panel messages
//! - A scripted in-memory worker API
//! - An axum mock worker bound to a loopback port

pub mod assertions;
pub mod fixtures;
pub mod mock_server;
pub mod scripted_api;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_server::*;
#[allow(unused_imports)]
pub use scripted_api::*;
