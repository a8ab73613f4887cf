//! Terminal run of a single task.
//!
//! Outbound messages are reduced into a `UiSnapshot` exactly as the panel
//! does, and only fields that changed are printed. When the worker pauses
//! for approval the user answers on stdin.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use colored::Colorize;
use osae_core::ControlSession;
use osae_protocol::config_models::ControlConfig;
use osae_protocol::ipc::OutboundMessage;
use osae_protocol::snapshot::{ApprovalNotice, UiSnapshot};
use osae_protocol::task_models::ApprovalDecision;
use serde_json::Value;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::sync::mpsc;

const OUTBOUND_CAPACITY: usize = 256;

/// Start a task and follow it until it completes or fails.
///
/// # Errors
///
/// Returns an error if activation or task creation fails, or if the task
/// ends in the failed state.
pub async fn run(config: ControlConfig, prompt: &str) -> Result<()> {
    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let session = ControlSession::activate(config, outbound_tx).await?;
    let result = follow(&session, &mut outbound_rx, prompt).await;
    session.shutdown().await;
    result
}

async fn follow(
    session: &ControlSession,
    outbound_rx: &mut mpsc::Receiver<OutboundMessage>,
    prompt: &str,
) -> Result<()> {
    let orchestrator = session.orchestrator();
    let started = orchestrator.start_task(prompt).await?;

    let mut snapshot = UiSnapshot::new();
    let mut renderer = Renderer::default();
    let mut prompted = false;
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let message = select! {
            message = outbound_rx.recv() => match message {
                Some(message) => message,
                None => return Ok(()),
            },
            _ = &mut ctrl_c => {
                println!("{}", "interrupted".dimmed());
                return Ok(());
            }
        };

        snapshot.apply(&message);
        for line in renderer.lines(&message, &snapshot) {
            println!("{line}");
        }

        let is_update = matches!(message, OutboundMessage::TaskUpdate { .. });
        match &message {
            OutboundMessage::TaskUpdate { .. } if !snapshot.awaiting_approval() => prompted = false,
            OutboundMessage::ApprovalRejected { .. } | OutboundMessage::ApprovalError { .. } => {
                prompted = false
            }
            _ => {}
        }

        if snapshot.is_terminal() {
            if snapshot.status() == Some("failed") {
                let reason = snapshot
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("no error reported");
                return Err(eyre!("task {} failed: {reason}", started.task_id));
            }
            return Ok(());
        }

        if is_update && snapshot.awaiting_approval() && !prompted {
            prompted = true;
            print_approval_prompt(snapshot.proposed_action());
            let answer = select! {
                line = input.next_line() => line?,
                _ = &mut ctrl_c => {
                    println!("{}", "interrupted".dimmed());
                    return Ok(());
                }
            };
            let decision = parse_decision(answer.as_deref().unwrap_or_default());
            // The outcome comes back as an approval notice.
            let _ = orchestrator
                .submit_approval(&started.task_id, decision)
                .await;
        }
    }
}

fn print_approval_prompt(action: Option<&str>) {
    let action = action.unwrap_or("(no action reported)");
    print!(
        "{} {}\n  approve? [y/N, or type feedback to reject] ",
        "⏸ approval required:".yellow().bold(),
        action.bold()
    );
    let _ = std::io::stdout().flush();
}

/// `y`/`yes` approves; an empty answer or `n`/`no` rejects; any other text
/// rejects with that text as feedback.
fn parse_decision(answer: &str) -> ApprovalDecision {
    let answer = answer.trim();
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => ApprovalDecision::approve(),
        "" | "n" | "no" => ApprovalDecision::reject(None),
        _ => ApprovalDecision::reject(Some(answer.to_string())),
    }
}

/// Remembers what was last printed so repeated polls stay quiet.
#[derive(Default)]
struct Renderer {
    status: Option<String>,
    plan: Vec<String>,
    step: Option<u64>,
    thought: Option<String>,
}

impl Renderer {
    fn lines(&mut self, message: &OutboundMessage, snapshot: &UiSnapshot) -> Vec<String> {
        let mut lines = Vec::new();
        match message {
            OutboundMessage::TaskStarted { task_id, simulated } => {
                *self = Self::default();
                let mut line = format!("{} task {task_id}", "▶".cyan().bold());
                if *simulated {
                    line.push_str(&format!(" {}", "(offline simulation)".yellow()));
                }
                lines.push(line);
            }
            OutboundMessage::TaskUpdate { .. } => self.update_lines(snapshot, &mut lines),
            OutboundMessage::TaskError { message, fatal } => {
                let label = if *fatal { "✗ task rejected:" } else { "✗ worker unreachable:" };
                lines.push(format!("{} {message}", label.red().bold()));
            }
            OutboundMessage::ApprovalApproved { .. }
            | OutboundMessage::ApprovalRejected { .. }
            | OutboundMessage::ApprovalError { .. } => {
                if let Some(notice) = &snapshot.approval_notice {
                    lines.push(notice_line(notice));
                }
            }
            OutboundMessage::PanelRefresh => {
                *self = Self::default();
                lines.push("task state cleared".dimmed().to_string());
            }
        }
        lines
    }

    fn update_lines(&mut self, snapshot: &UiSnapshot, lines: &mut Vec<String>) {
        let plan: Vec<String> = snapshot.plan().into_iter().map(str::to_string).collect();
        if !plan.is_empty() && plan != self.plan {
            lines.push("plan:".bold().to_string());
            for (index, step) in plan.iter().enumerate() {
                lines.push(format!("  {}. {step}", index + 1));
            }
            self.plan = plan;
            self.step = None;
        }

        let step = snapshot.current_step_index();
        if step.is_some() && step != self.step && !self.plan.is_empty() {
            if let Some(step) = step {
                lines.push(step_line(&self.plan, step));
            }
            self.step = step;
        }

        let thought = snapshot.thought_trace().map(str::to_string);
        if thought.is_some() && thought != self.thought {
            if let Some(thought) = &thought {
                lines.push(format!("  {}", thought.dimmed()));
            }
            self.thought = thought;
        }

        let status = snapshot.status().map(str::to_string);
        if status.is_some() && status != self.status {
            if let Some(status) = &status {
                lines.push(format!("status: {}", paint_status(status)));
            }
            if status.as_deref() == Some("failed") {
                if let Some(error) = snapshot.get("error").and_then(Value::as_str) {
                    lines.push(format!("  {}", error.red()));
                }
            }
            self.status = status;
        }
    }
}

fn step_line(plan: &[String], step: u64) -> String {
    let total = plan.len();
    match usize::try_from(step).ok().and_then(|index| plan.get(index)) {
        Some(text) => format!("{} step {}/{total}: {text}", "→".cyan(), step + 1),
        None => format!("{} all {total} steps done", "✓".green()),
    }
}

fn paint_status(status: &str) -> String {
    match status {
        "completed" => status.green().bold().to_string(),
        "failed" => status.red().bold().to_string(),
        "paused_for_approval" => status.yellow().to_string(),
        _ => status.cyan().to_string(),
    }
}

fn notice_line(notice: &ApprovalNotice) -> String {
    match notice {
        ApprovalNotice::Approved => format!("{} approved, resuming", "✓".green()),
        ApprovalNotice::Rejected { feedback: None } => format!("{} rejected", "✗".yellow()),
        ApprovalNotice::Rejected {
            feedback: Some(feedback),
        } => format!("{} rejected: {feedback}", "✗".yellow()),
        ApprovalNotice::Error { message } => {
            format!("{} approval not delivered: {message}", "✗".red())
        }
    }
}
