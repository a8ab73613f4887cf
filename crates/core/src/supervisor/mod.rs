//! Process Supervisor: owns the worker process lifecycle.
//!
//! The supervisor launches the worker under a resolved interpreter, captures
//! its output line by line for diagnostics, observes its exit asynchronously
//! and terminates it on shutdown. It never parses worker output for control
//! signals and never touches task state: an outage is discovered by the
//! orchestrator through failed requests.

pub mod error;
pub mod launcher;
pub mod output;

pub use error::{LaunchError, ProbeError};
pub use output::OutputBuffer;

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use osae_protocol::config_models::WorkerSettings;
use osae_protocol::worker_models::{OutputLine, OutputStream, WorkerProcess, WorkerState};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{ClientError, TaskApi};

/// How long the exit watcher waits for output capture to drain.
const CAPTURE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Result of a readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
}

struct RunningWorker {
    pid: Option<u32>,
    kill: CancellationToken,
    watcher: JoinHandle<()>,
}

/// Supervises the single worker process.
pub struct WorkerSupervisor {
    settings: WorkerSettings,
    state: Arc<watch::Sender<WorkerState>>,
    output: OutputBuffer,
    running: Mutex<Option<RunningWorker>>,
}

impl WorkerSupervisor {
    pub fn new(settings: WorkerSettings) -> Self {
        let (state, _) = watch::channel(WorkerState::NotStarted);
        let output = OutputBuffer::new(settings.output_buffer_lines);
        Self {
            settings,
            state: Arc::new(state),
            output,
            running: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch lifecycle changes, including exits observed after launch.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Buffered worker output, oldest first.
    pub async fn output(&self) -> Vec<OutputLine> {
        self.output.snapshot().await
    }

    /// Launch the worker process.
    ///
    /// The child's stdin is bound to nothing; stdout and stderr are captured
    /// into the output buffer. Exit is observed in the background and
    /// recorded as `WorkerState::Exited`.
    ///
    /// # Returns
    ///
    /// A description of the launched process.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError` if the interpreter or entrypoint cannot be
    /// resolved, the spawn fails, or a worker is already running. No process
    /// is left behind on error.
    pub async fn launch(&self) -> Result<WorkerProcess, LaunchError> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            if !self.state().has_exited() {
                return Err(LaunchError::AlreadyRunning { pid: current.pid });
            }
        }

        let interpreter = launcher::resolve_interpreter(&self.settings)
            .await
            .inspect_err(|error| error!(%error, "cannot resolve worker interpreter"))?;

        let entrypoint = self.settings.entrypoint.clone();
        if !entrypoint.is_file() {
            error!(path = %entrypoint.display(), "worker entrypoint missing");
            return Err(LaunchError::EntrypointMissing { path: entrypoint });
        }

        self.state.send_replace(WorkerState::Starting);
        self.output.clear().await;

        let mut child = match self.command(&interpreter, &entrypoint).spawn() {
            Ok(child) => child,
            Err(source) => {
                self.state.send_replace(WorkerState::NotStarted);
                error!(program = %interpreter.display(), error = %source, "failed to spawn worker");
                return Err(LaunchError::Spawn {
                    program: interpreter.display().to_string(),
                    source,
                });
            }
        };

        let pid = child.id();
        info!(?pid, interpreter = %interpreter.display(), entrypoint = %entrypoint.display(), "worker spawned");

        let mut captures = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            captures.push(spawn_capture(stdout, OutputStream::Stdout, self.output.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            captures.push(spawn_capture(stderr, OutputStream::Stderr, self.output.clone()));
        }

        self.state.send_replace(WorkerState::Running);

        let kill = CancellationToken::new();
        let watcher = tokio::spawn(watch_exit(
            child,
            kill.clone(),
            captures,
            Arc::clone(&self.state),
        ));

        *running = Some(RunningWorker { pid, kill, watcher });

        Ok(WorkerProcess {
            pid,
            interpreter,
            entrypoint,
            state: WorkerState::Running,
        })
    }

    fn command(&self, interpreter: &Path, entrypoint: &Path) -> Command {
        let mut command = Command::new(interpreter);
        command
            .arg(entrypoint)
            .args(&self.settings.args)
            .envs(&self.settings.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = self.working_dir(entrypoint) {
            command.current_dir(dir);
        }
        command
    }

    fn working_dir(&self, entrypoint: &Path) -> Option<PathBuf> {
        self.settings.working_dir.clone().or_else(|| {
            entrypoint
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
    }

    /// Terminate the worker.
    ///
    /// Safe to call when no worker was ever started, when it already exited,
    /// and any number of times in a row.
    pub async fn terminate(&self) {
        let Some(worker) = self.running.lock().await.take() else {
            debug!("terminate: no worker process");
            return;
        };

        worker.kill.cancel();
        if let Err(error) = worker.watcher.await {
            warn!(%error, "worker exit watcher did not finish cleanly");
        }
        info!(pid = ?worker.pid, state = ?self.state(), "worker terminated");
    }

    /// Wait until the worker has exited.
    ///
    /// Returns immediately when no worker was started.
    pub async fn wait_for_exit(&self) -> WorkerState {
        let mut rx = self.subscribe();
        let current = *rx.borrow_and_update();
        if matches!(current, WorkerState::NotStarted) || current.has_exited() {
            return current;
        }

        let exited = match rx.wait_for(WorkerState::has_exited).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        exited
    }

    /// Check whether the worker answers its health endpoint.
    ///
    /// Waits the configured grace delay first. Diagnostic only: callers do
    /// not gate task creation on the outcome.
    ///
    /// # Returns
    ///
    /// - `Ready` on a 2xx health response
    /// - `NotReady` if the worker exited or cannot be reached
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::Unhealthy` if a reachable worker answers with a
    /// non-success status.
    pub async fn probe_ready(&self, api: &dyn TaskApi) -> Result<Readiness, ProbeError> {
        tokio::time::sleep(self.settings.probe_grace()).await;

        if self.state().has_exited() {
            return Ok(Readiness::NotReady);
        }

        match api.health().await {
            Ok(()) => Ok(Readiness::Ready),
            Err(ClientError::Http { status, body }) => Err(ProbeError::Unhealthy { status, body }),
            Err(error) => {
                debug!(%error, "health probe failed");
                Ok(Readiness::NotReady)
            }
        }
    }

    /// Run [`probe_ready`](Self::probe_ready) in the background and log the
    /// outcome.
    pub fn spawn_probe(self: &Arc<Self>, api: Arc<dyn TaskApi>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            match supervisor.probe_ready(api.as_ref()).await {
                Ok(Readiness::Ready) => info!("worker is ready"),
                Ok(Readiness::NotReady) => {
                    warn!(state = ?supervisor.state(), "worker is not answering health checks yet")
                }
                Err(error) => warn!(%error, "worker reported unhealthy"),
            }
        })
    }
}

fn spawn_capture<R>(reader: R, stream: OutputStream, output: OutputBuffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match stream {
                OutputStream::Stdout => debug!(target: "osae::worker", stream = "stdout", "{line}"),
                OutputStream::Stderr => warn!(target: "osae::worker", stream = "stderr", "{line}"),
            }
            output.push(stream, line).await;
        }
    })
}

async fn watch_exit(
    mut child: Child,
    kill: CancellationToken,
    captures: Vec<JoinHandle<()>>,
    state: Arc<watch::Sender<WorkerState>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = kill.cancelled() => {
            if let Err(error) = child.start_kill() {
                debug!(%error, "worker already gone");
            }
            child.wait().await
        }
    };

    for capture in captures {
        if tokio::time::timeout(CAPTURE_DRAIN_TIMEOUT, capture).await.is_err() {
            debug!("worker output still open after exit");
        }
    }

    let exited = match status {
        Ok(status) => exit_state(status),
        Err(error) => {
            warn!(%error, "failed to collect worker exit status");
            WorkerState::Exited {
                code: None,
                signal: None,
            }
        }
    };

    if kill.is_cancelled() {
        info!(state = ?exited, "worker stopped");
    } else {
        warn!(state = ?exited, "worker exited");
    }
    state.send_replace(exited);
}

fn exit_state(status: ExitStatus) -> WorkerState {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    WorkerState::Exited {
        code: status.code(),
        signal,
    }
}
