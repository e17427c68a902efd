//! Start command - launches the ArchAdvisor server.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;

use archadvisor_config::{ArchAdvisorConfig, load_config, load_config_file};
use archadvisor_events::{EventBus, EventBusConfig};
use archadvisor_pipeline::Orchestrator;
use archadvisor_server::{Server, ServerConfig};
use archadvisor_store::{RunStore, StoreConfig};
use super::{Context, validation_engine};
use crate::offline;

/// How often retired event streams are checked for removal.
const BUS_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<IpAddr>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Config file layered on top of the discovered ones
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), ctx)?;
    let server_config = server_config(&config, args.bind, args.port)?;

    let store = RunStore::new(StoreConfig::from(&config.store()));
    let bus = EventBus::new(EventBusConfig::from(&config.events()));
    let engine = Arc::new(validation_engine(
        config.validation().domain_rules_dir.as_deref(),
    )?);

    // Background sweepers: expired runs and retired event streams.
    let _store_sweeper = store.spawn_sweeper();
    let _bus_sweeper = bus.spawn_sweeper(BUS_SWEEP_INTERVAL);

    let orchestrator = Orchestrator::new(store, bus, engine, offline::handlers());

    if !ctx.json_output {
        let bold = Style::new().bold();
        println!(
            "{} listening on {}",
            bold.apply_to("ArchAdvisor"),
            server_config.bind_address
        );
        println!("  Step handlers: offline ({})", offline::OFFLINE_MODEL);
        if let Some(dir) = config.validation().domain_rules_dir {
            println!("  Domain rules: {}", dir.display());
        }
        if !server_config.rate_limiting {
            println!("  Rate limiting: disabled");
        }
    }

    tracing::info!(
        bind = %server_config.bind_address,
        rate_limiting = server_config.rate_limiting,
        "Starting server"
    );

    Server::new(orchestrator, server_config).run().await?;
    Ok(())
}

/// Discovered layers, then the explicit `--config` file on top.
fn resolve_config(explicit: Option<&std::path::Path>, ctx: &Context) -> Result<ArchAdvisorConfig> {
    let cwd = std::env::current_dir().ok();
    let loaded = load_config(cwd.as_deref())?;

    let dim = Style::new().dim();
    let yellow = Style::new().yellow();
    for warning in &loaded.warnings {
        eprintln!("{} {warning}", yellow.apply_to("warning:"));
    }
    if ctx.verbose {
        for path in loaded.loaded_from() {
            eprintln!("{}", dim.apply_to(format!("config: {}", path.display())));
        }
    }

    let mut config = loaded.config;
    if let Some(path) = explicit {
        let layer = load_config_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        config.merge(layer);
    }
    Ok(config)
}

/// Server settings from config, with CLI overrides applied.
fn server_config(
    config: &ArchAdvisorConfig,
    bind: Option<IpAddr>,
    port: Option<u16>,
) -> Result<ServerConfig> {
    let server = ServerConfig::from_config(config)?;
    let mut addr: SocketAddr = server.bind_address;
    if let Some(ip) = bind {
        addr.set_ip(ip);
    }
    if let Some(port) = port {
        addr.set_port(port);
    }
    Ok(server.with_bind_address(addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let config = ArchAdvisorConfig::from_toml("[server]\nbind = \"0.0.0.0:9000\"\n").unwrap();

        let server = server_config(&config, None, None).unwrap();
        assert_eq!(server.bind_address, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());

        let server = server_config(&config, None, Some(9100)).unwrap();
        assert_eq!(server.bind_address, "0.0.0.0:9100".parse::<SocketAddr>().unwrap());

        let server = server_config(&config, Some("127.0.0.1".parse().unwrap()), None).unwrap();
        assert_eq!(server.bind_address, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_default_bind() {
        let server = server_config(&ArchAdvisorConfig::new(), None, None).unwrap();
        assert_eq!(server.bind_address, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
    }
}
