//! Interpreter resolution for the worker process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use osae_protocol::config_models::WorkerSettings;
use tokio::process::Command;
use tracing::{debug, info};

use super::error::LaunchError;

/// Deadline for a launcher's `--version` answer.
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve the interpreter the worker runs under.
///
/// A pinned `interpreter` must exist; its absence is fatal and no launcher is
/// tried in its place. Without a pin, each name in `launchers` is looked up
/// on `PATH` and asked for `--version`; the first that exits successfully is
/// used.
///
/// # Errors
///
/// - `LaunchError::InterpreterMissing` if the pinned interpreter is absent
/// - `LaunchError::NoLauncher` if no launcher answers
pub async fn resolve_interpreter(settings: &WorkerSettings) -> Result<PathBuf, LaunchError> {
    if let Some(pinned) = &settings.interpreter {
        return resolve_pinned(pinned);
    }

    let mut tried = Vec::with_capacity(settings.launchers.len());
    for name in &settings.launchers {
        tried.push(name.clone());

        let Ok(path) = which::which(name) else {
            debug!(launcher = %name, "launcher not found on PATH");
            continue;
        };

        if answers_version(&path).await {
            info!(launcher = %name, path = %path.display(), "resolved worker interpreter");
            return Ok(path);
        }
        debug!(launcher = %name, "launcher did not answer --version");
    }

    Err(LaunchError::NoLauncher { tried })
}

fn resolve_pinned(pinned: &Path) -> Result<PathBuf, LaunchError> {
    let missing = || LaunchError::InterpreterMissing {
        path: pinned.to_path_buf(),
    };

    if pinned.components().count() > 1 || pinned.is_absolute() {
        return if pinned.is_file() {
            Ok(pinned.to_path_buf())
        } else {
            Err(missing())
        };
    }

    which::which(pinned).map_err(|_| missing())
}

async fn answers_version(path: &Path) -> bool {
    let mut command = Command::new(path);
    command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(VERSION_PROBE_TIMEOUT, command.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(error)) => {
            debug!(path = %path.display(), %error, "launcher failed to start");
            false
        }
        Err(_) => false,
    }
}
