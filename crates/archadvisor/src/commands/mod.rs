//! CLI command handlers.

pub mod start;
pub mod status;
pub mod submit;
pub mod templates;
pub mod validate;

use std::path::Path;

use anyhow::Context as _;
use console::Style;

use archadvisor_types::{RunStatus, Severity};
use archadvisor_validate::{DomainCatalog, ValidationEngine};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server URL to connect to.
    pub server_url: String,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The built-in validators, plus domain rule checks when a rules
/// directory is given.
pub fn validation_engine(domain_rules: Option<&Path>) -> anyhow::Result<ValidationEngine> {
    let engine = ValidationEngine::new();
    let Some(dir) = domain_rules else {
        return Ok(engine);
    };
    let catalog = DomainCatalog::load_dir(dir)
        .with_context(|| format!("Failed to load domain rules from {}", dir.display()))?;
    Ok(engine.with_domain_rules(catalog))
}

pub fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Critical => Style::new().red().bold(),
        Severity::High => Style::new().red(),
        Severity::Medium => Style::new().yellow(),
        Severity::Low => Style::new().dim(),
    }
}

pub fn status_style(status: RunStatus) -> Style {
    match status {
        RunStatus::Complete => Style::new().green(),
        RunStatus::Error => Style::new().red(),
        RunStatus::Cancelled => Style::new().yellow(),
        _ => Style::new().cyan(),
    }
}
