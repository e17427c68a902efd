//! Status command - shows server health, or one run's progress.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use archadvisor_server::RunStatusResponse;

use super::{Context, print_json, status_style};
use crate::client::Client;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Run to inspect; omit for server health
    pub run_id: Option<String>,

    /// Also print the run's final document once it is complete
    #[arg(long)]
    pub output: bool,
}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    running: bool,
    version: Option<String>,
    uptime_seconds: Option<f64>,
    server_url: String,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;
    match args.run_id {
        Some(run_id) => run_status(&client, &run_id, args.output, ctx).await,
        None => server_status(&client, ctx).await,
    }
}

async fn server_status(client: &Client, ctx: &Context) -> Result<()> {
    let dim = Style::new().dim();

    match client.health().await {
        Ok(health) => {
            if ctx.json_output {
                return print_json(&StatusOutput {
                    running: true,
                    version: Some(health.version),
                    uptime_seconds: Some(health.uptime_seconds),
                    server_url: ctx.server_url.clone(),
                });
            }

            println!();
            println!("{}", style("ArchAdvisor Server Status").bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            println!();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().green().apply_to("● running")
            );
            println!("  {} {}", dim.apply_to("Version:"), health.version);
            println!(
                "  {} {:.0}s",
                dim.apply_to("Uptime:"),
                health.uptime_seconds
            );
            println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);
            println!();
        }
        Err(e) => {
            if ctx.json_output {
                return print_json(&StatusOutput {
                    running: false,
                    version: None,
                    uptime_seconds: None,
                    server_url: ctx.server_url.clone(),
                });
            }

            println!();
            println!("{}", style("ArchAdvisor Server Status").bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            println!();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().red().apply_to("● not running")
            );
            println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);
            if ctx.verbose {
                println!();
                println!("  {} {}", dim.apply_to("Error:"), e);
            }
            println!();
            println!("  {}", dim.apply_to("Start the server with: archadvisor start"));
            println!();
        }
    }
    Ok(())
}

async fn run_status(client: &Client, run_id: &str, with_output: bool, ctx: &Context) -> Result<()> {
    let status = client.run_status(run_id).await?;
    let output = if with_output && status.status.is_terminal() {
        Some(client.run_output(run_id).await?)
    } else {
        None
    };

    if ctx.json_output {
        print_json(&status)?;
        if let Some(output) = &output {
            print_json(output)?;
        }
        return Ok(());
    }

    print_run(&status, ctx.verbose);
    if let Some(output) = output {
        println!();
        println!("{}", output.markdown);
    }
    Ok(())
}

fn print_run(run: &RunStatusResponse, verbose: bool) {
    let dim = Style::new().dim();
    let progress = &run.progress;

    println!();
    println!("{} {}", style("Run").bold(), run.run_id);
    println!("{}", dim.apply_to("─".repeat(40)));
    println!(
        "  {} {}",
        dim.apply_to("Status:"),
        status_style(run.status).apply_to(run.status)
    );
    if progress.steps_completed >= 0 {
        println!(
            "  {} {}/{}",
            dim.apply_to("Steps:"),
            progress.steps_completed,
            progress.total_steps
        );
    }
    if let Some(agent) = progress.current_agent {
        println!("  {} {}", dim.apply_to("Agent:"), agent.label());
    }
    println!(
        "  {} debate {}, validation {}",
        dim.apply_to("Rounds:"),
        progress.debate_round,
        progress.validation_round
    );
    if let Some(score) = run.validation_score {
        println!("  {} {score}/100", dim.apply_to("Validation score:"));
    }
    println!("  {} ${:.2}", dim.apply_to("Cost:"), run.cost_so_far_usd);

    if run.validation_incomplete {
        println!(
            "  {}",
            Style::new().yellow().apply_to("Validation never passed; design forced through")
        );
    }
    if run.debate_unresolved {
        println!(
            "  {}",
            Style::new().yellow().apply_to("Review debate ended unresolved")
        );
    }

    if verbose && !run.messages.is_empty() {
        println!();
        for message in &run.messages {
            println!(
                "  {} {}",
                dim.apply_to(format!("{:<18}", message.agent.label())),
                message.summary
            );
        }
    }

    for error in &run.errors {
        println!(
            "  {} {}: {}",
            Style::new().red().apply_to("error"),
            error.step,
            error.message
        );
    }
    println!();
}
