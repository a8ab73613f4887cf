//! Configuration models for `.osae/config.toml`.
//!
//! This module defines the structure of the project-local configuration file
//! that controls how the worker is launched and how tasks are driven.

use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use ts_rs::TS;

/// Represents all settings from `.osae/config.toml`.
///
/// # Example
///
/// ```toml
/// # .osae/config.toml
/// [worker]
/// base_url = "http://127.0.0.1:8000"
/// interpreter = "agent-server/.venv/bin/python"
/// entrypoint = "agent-server/main.py"
///
/// [tasks]
/// poll_interval_ms = 1000
/// offline_fallback = "simulate"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct ControlConfig {
    #[serde(default)]
    pub worker: WorkerSettings,

    #[serde(default)]
    pub tasks: TaskSettings,
}

/// How the worker process is located, launched and reached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct WorkerSettings {
    /// Root URL of the worker's loopback HTTP API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Pinned interpreter path.
    ///
    /// When set, a missing interpreter is fatal; no other launcher is tried.
    #[serde(default)]
    pub interpreter: Option<PathBuf>,

    /// Launcher names probed with `--version`, in order, when no interpreter
    /// is pinned.
    #[serde(default = "default_launchers")]
    pub launchers: Vec<String>,

    /// Script the interpreter runs.
    #[serde(default = "default_entrypoint")]
    pub entrypoint: PathBuf,

    /// Extra arguments after the entrypoint.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for the worker.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory; defaults to the entrypoint's directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Launch the worker when the control surface activates.
    #[serde(default = "default_true")]
    pub autostart: bool,

    /// Delay between launch and the diagnostic health probe.
    #[serde(default = "default_probe_grace_ms")]
    pub probe_grace_ms: u64,

    /// Number of output lines kept per worker for diagnostics.
    #[serde(default = "default_output_buffer_lines")]
    pub output_buffer_lines: usize,
}

impl WorkerSettings {
    pub fn probe_grace(&self) -> Duration {
        Duration::from_millis(self.probe_grace_ms)
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            interpreter: None,
            launchers: default_launchers(),
            entrypoint: default_entrypoint(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            autostart: true,
            probe_grace_ms: default_probe_grace_ms(),
            output_buffer_lines: default_output_buffer_lines(),
        }
    }
}

/// What happens when task creation cannot reach the worker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Run the offline simulation.
    #[default]
    Simulate,

    /// Surface the failure to the user.
    FailLoud,
}

/// Timing and fallback settings for the task lifecycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct TaskSettings {
    /// Deadline for `POST /task`.
    #[serde(default = "default_create_timeout_ms")]
    pub create_timeout_ms: u64,

    /// Fixed interval between status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Optional per-poll request deadline. Polls are unbounded when unset.
    #[serde(default)]
    pub poll_timeout_ms: Option<u64>,

    #[serde(default)]
    pub offline_fallback: FallbackPolicy,

    /// Interval between simulated progress updates.
    #[serde(default = "default_simulation_tick_ms")]
    pub simulation_tick_ms: u64,
}

impl TaskSettings {
    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }

    pub fn simulation_tick(&self) -> Duration {
        Duration::from_millis(self.simulation_tick_ms)
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            create_timeout_ms: default_create_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_ms: None,
            offline_fallback: FallbackPolicy::default(),
            simulation_tick_ms: default_simulation_tick_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_launchers() -> Vec<String> {
    vec!["python3".to_string(), "python".to_string(), "py".to_string()]
}

fn default_entrypoint() -> PathBuf {
    PathBuf::from("agent-server/main.py")
}

fn default_true() -> bool {
    true
}

fn default_probe_grace_ms() -> u64 {
    2_000
}

fn default_output_buffer_lines() -> usize {
    200
}

fn default_create_timeout_ms() -> u64 {
    3_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_simulation_tick_ms() -> u64 {
    1_000
}
