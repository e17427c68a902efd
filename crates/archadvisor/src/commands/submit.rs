//! Submit command - starts a run on the server.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;

use archadvisor_types::{EventKind, Preferences, RunEvent};

use super::{Context, print_json, severity_style};
use crate::client::Client;

/// Arguments for the submit command.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Requirements text file
    pub requirements: PathBuf,

    /// Upper bound on review/revision rounds (1-5)
    #[arg(long)]
    pub max_debate_rounds: Option<u32>,

    /// Stream the run's events until it finishes
    #[arg(short, long)]
    pub follow: bool,
}

/// Run the submit command.
pub async fn run(args: SubmitArgs, ctx: &Context) -> Result<()> {
    let requirements = std::fs::read_to_string(&args.requirements).with_context(|| {
        format!(
            "Failed to read requirements file {}",
            args.requirements.display()
        )
    })?;
    let preferences = args
        .max_debate_rounds
        .map(|rounds| Preferences::default().with_max_debate_rounds(rounds));

    let client = Client::new(&ctx.server_url)?;
    let created = client.submit(requirements, preferences).await?;

    if ctx.json_output && !args.follow {
        return print_json(&created);
    }

    if !ctx.json_output {
        let bold = Style::new().bold();
        let dim = Style::new().dim();
        println!("{} {}", bold.apply_to("Run submitted:"), created.run_id);
        println!(
            "  {}",
            dim.apply_to(format!(
                "~{}s, ~${:.2}",
                created.estimated_duration_seconds, created.estimated_cost_usd
            ))
        );
    }

    if args.follow {
        let json = ctx.json_output;
        client
            .follow(created.run_id.as_str(), |event| {
                if json {
                    if let Ok(line) = serde_json::to_string(event) {
                        println!("{line}");
                    }
                } else {
                    print_event(event);
                }
            })
            .await?;
    }
    Ok(())
}

/// One human-readable line per event.
fn print_event(event: &RunEvent) {
    let dim = Style::new().dim();
    let line = match &event.kind {
        EventKind::AgentStarted { label, message, .. } => format!("{label}: {message}"),
        EventKind::AgentThinking { message, .. } => dim.apply_to(message).to_string(),
        EventKind::AgentCompleted {
            summary,
            duration_seconds,
            ..
        } => format!("  done in {duration_seconds:.1}s: {summary}"),
        EventKind::FindingDiscovered {
            severity, summary, ..
        } => format!(
            "  {} {summary}",
            severity_style(*severity).apply_to(severity.as_str())
        ),
        EventKind::DebateRoundStarted { round, max_rounds } => {
            format!("Debate round {round}/{max_rounds}")
        }
        EventKind::DebateRoundCompleted {
            findings_total,
            findings_critical,
            next_action,
            ..
        } => format!(
            "  {findings_total} finding(s), {findings_critical} critical, next: {next_action:?}"
        ),
        EventKind::WorkflowProgress {
            step,
            total_steps,
            message,
            ..
        } => dim.apply_to(format!("[{step}/{total_steps}] {message}")).to_string(),
        EventKind::RunComplete {
            duration_seconds,
            total_cost_usd,
            output_url,
            ..
        } => Style::new()
            .green()
            .apply_to(format!(
                "Complete in {duration_seconds:.1}s (${total_cost_usd:.2}); output at {output_url}"
            ))
            .to_string(),
        EventKind::RunCancelled { message } => {
            Style::new().yellow().apply_to(message).to_string()
        }
        EventKind::Error { message, .. } => Style::new().red().apply_to(message).to_string(),
    };
    println!("{line}");
}
