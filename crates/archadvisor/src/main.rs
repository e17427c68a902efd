//! ArchAdvisor - architecture design pipeline with deterministic validation
//!
//! Main entry point for the ArchAdvisor CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;
mod offline;

use commands::{start, status, submit, templates, validate};

/// Default server URL when neither `--server` nor the environment sets one.
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// ArchAdvisor - architecture design pipeline with deterministic validation
#[derive(Parser)]
#[command(name = "archadvisor")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://127.0.0.1:8000)
    #[arg(long, global = true, env = "ARCHADVISOR_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the ArchAdvisor server
    Start(start::StartArgs),

    /// Validate a design file locally
    Validate(validate::ValidateArgs),

    /// Submit requirements for a new run
    Submit(submit::SubmitArgs),

    /// Show server health or a run's status
    Status(status::StatusArgs),

    /// List sample requirement templates
    Templates(templates::TemplatesArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "archadvisor=debug,archadvisor_server=debug,archadvisor_pipeline=debug,archadvisor_validate=debug,archadvisor_events=debug,archadvisor_store=debug,archadvisor_config=debug,info"
    } else {
        "archadvisor=info,archadvisor_server=info,archadvisor_pipeline=info,archadvisor_validate=info,warn"
    };

    let log_dir = archadvisor_config::log_dir().unwrap_or_else(|| std::path::PathBuf::from("logs"));
    // The file layer is skipped when the log directory is unusable.
    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("archadvisor.log")
        .build(&log_dir);
    let (file_writer, _guard) = match file_appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (Some(non_blocking), Some(guard))
        }
        Err(_) => (None, None),
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "archadvisor=trace,archadvisor_server=trace,archadvisor_pipeline=trace,archadvisor_validate=trace,archadvisor_events=trace,archadvisor_store=trace,archadvisor_config=trace,info",
                ))
        }))
        .init();

    let server_url = cli
        .server
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Validate(args) => validate::run(args, &ctx).await,
        Commands::Submit(args) => submit::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Templates(args) => templates::run(args, &ctx).await,
    }
}
