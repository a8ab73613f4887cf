//! Test fixtures for creating orchestrators, settings and worker scripts.

use osae_core::channel::UiSyncChannel;
use osae_core::client::{ClientError, TaskApi};
use osae_core::orchestrator::TaskOrchestrator;
use osae_protocol::config_models::{FallbackPolicy, TaskSettings, WorkerSettings};
use osae_protocol::ipc::OutboundMessage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of the outbound queue used in tests.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Build an orchestrator over `api` and return the panel side of its
/// channel.
#[allow(dead_code)]
pub fn orchestrator_with(
    api: Arc<dyn TaskApi>,
    settings: TaskSettings,
) -> (TaskOrchestrator, mpsc::Receiver<OutboundMessage>) {
    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let channel = UiSyncChannel::new(tx);
    (TaskOrchestrator::new(api, channel, settings), rx)
}

#[allow(dead_code)]
pub fn fail_loud_settings() -> TaskSettings {
    TaskSettings {
        offline_fallback: FallbackPolicy::FailLoud,
        ..TaskSettings::default()
    }
}

/// A connectivity-class error as produced by an aborted create request.
#[allow(dead_code)]
pub fn timed_out() -> ClientError {
    ClientError::Unreachable {
        url: "http://127.0.0.1:8000/task".to_string(),
        message: "operation timed out".to_string(),
        timed_out: true,
    }
}

#[allow(dead_code)]
pub fn connection_refused() -> ClientError {
    ClientError::Unreachable {
        url: "http://127.0.0.1:8000/task".to_string(),
        message: "connection refused".to_string(),
        timed_out: false,
    }
}

#[allow(dead_code)]
pub fn server_error() -> ClientError {
    ClientError::Http {
        status: 500,
        body: "Internal Server Error".to_string(),
    }
}

/// Write an executable shell script into `dir`.
#[cfg(unix)]
#[allow(dead_code)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> std::io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Worker settings that run `entrypoint` under `/bin/sh`.
#[allow(dead_code)]
pub fn shell_worker(entrypoint: PathBuf) -> WorkerSettings {
    WorkerSettings {
        interpreter: Some(PathBuf::from("/bin/sh")),
        entrypoint,
        probe_grace_ms: 0,
        ..WorkerSettings::default()
    }
}
