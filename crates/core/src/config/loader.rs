//! Configuration file loader for the `.osae/` directory.
//!
//! Loads `.osae/config.toml`, resolves relative paths against the project
//! root and validates the settings the orchestrator depends on.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use osae_protocol::config_models::ControlConfig;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Name of the project-local configuration directory.
pub const CONFIG_DIR: &str = ".osae";

/// Loads the control surface configuration from `<root>/.osae/config.toml`.
///
/// # Arguments
///
/// * `root` - Project root containing the `.osae/` folder
///
/// # Returns
///
/// A `ControlConfig` with relative `interpreter`, `entrypoint` and
/// `working_dir` paths resolved against `root`. If the directory or file is
/// missing, returns the default configuration (also resolved) rather than an
/// error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - The file exists but cannot be read
/// - The file is not valid TOML or does not match the schema
/// - A timing value is zero or the base URL is empty
///
/// # Example
///
/// ```rust,no_run
/// use osae_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Worker at {}", config.worker.base_url);
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<ControlConfig> {
    let config_path = root.join(CONFIG_DIR).join("config.toml");

    let mut config = if config_path.exists() {
        let content = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|source| ConfigError::FileRead {
                path: config_path.clone(),
                source,
            })?;

        toml::from_str::<ControlConfig>(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?
    } else {
        ControlConfig::default()
    };

    validate(&config, &config_path)?;
    resolve_paths(&mut config, root);

    Ok(config)
}

fn validate(config: &ControlConfig, path: &Path) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidConfig {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if config.worker.base_url.trim().is_empty() {
        return Err(invalid("worker.base_url must not be empty"));
    }
    if config.tasks.poll_interval_ms == 0 {
        return Err(invalid("tasks.poll_interval_ms must be greater than zero"));
    }
    if config.tasks.create_timeout_ms == 0 {
        return Err(invalid("tasks.create_timeout_ms must be greater than zero"));
    }
    if config.tasks.simulation_tick_ms == 0 {
        return Err(invalid("tasks.simulation_tick_ms must be greater than zero"));
    }
    if config.worker.interpreter.is_none() && config.worker.launchers.is_empty() {
        return Err(invalid(
            "worker.launchers must not be empty when no interpreter is pinned",
        ));
    }

    Ok(())
}

fn resolve_paths(config: &mut ControlConfig, root: &Path) {
    let worker = &mut config.worker;
    worker.interpreter = worker
        .interpreter
        .take()
        .map(|path| resolve_interpreter_path(root, path));
    worker.entrypoint = resolve(root, std::mem::take(&mut worker.entrypoint));
    worker.working_dir = worker.working_dir.take().map(|path| resolve(root, path));
}

/// A name without a separator (`python3.11`) stays bare for PATH lookup.
fn resolve_interpreter_path(root: &Path, path: PathBuf) -> PathBuf {
    let mut components = path.components();
    if matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        path
    } else {
        resolve(root, path)
    }
}

fn resolve(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
