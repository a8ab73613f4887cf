//! `osae` binary.
//!
//! Hosts the control surface outside an editor: `panel` bridges the UI sync
//! channel over stdin/stdout as JSON lines, `start` runs one task in the
//! terminal, `reset` and `health` talk to an already running worker.

mod panel;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use colored::Colorize;
use osae_core::client::{HttpTaskClient, TaskApi};
use osae_core::config::loader::load_config;
use osae_protocol::config_models::ControlConfig;

#[derive(Parser, Debug)]
#[command(name = "osae")]
#[command(version, about = "Control surface for a local agent worker")]
struct Cli {
    /// Project root containing `.osae/config.toml`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Override the worker's base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Do not launch the worker; assume one is already listening.
    #[arg(long, global = true)]
    no_launch: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Bridge the panel channel over stdin/stdout (default)
    Panel,
    /// Run one task and answer approval prompts in the terminal
    Start {
        /// Task prompt
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// Clear all task state on the worker
    Reset,
    /// Check that the worker answers its health endpoint
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli.root)
        .await
        .wrap_err_with(|| format!("failed to load configuration under {}", cli.root.display()))?;
    let config = apply_overrides(config, &cli);

    match cli.command.unwrap_or(Command::Panel) {
        Command::Panel => panel::run(config).await,
        Command::Start { prompt } => render::run(config, &prompt.join(" ")).await,
        Command::Reset => {
            client_for(&config)?.reset().await?;
            println!("{} worker state cleared", "✓".green());
            Ok(())
        }
        Command::Health => {
            client_for(&config)?.health().await?;
            println!("{} worker at {} is healthy", "✓".green(), config.worker.base_url);
            Ok(())
        }
    }
}

/// Logs go to stderr; stdout carries the panel bridge.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn apply_overrides(mut config: ControlConfig, cli: &Cli) -> ControlConfig {
    if let Some(base_url) = &cli.base_url {
        config.worker.base_url = base_url.clone();
    }
    if cli.no_launch {
        config.worker.autostart = false;
    }
    config
}

fn client_for(config: &ControlConfig) -> Result<HttpTaskClient> {
    HttpTaskClient::new(&config.worker, &config.tasks)
        .map_err(|error| eyre!("cannot build worker client: {error}"))
}
