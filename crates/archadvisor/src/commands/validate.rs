//! Validate command - runs the validation engine on a local design file.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;

use archadvisor_types::ValidationReport;

use super::{Context, print_json, severity_style, validation_engine};

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Design JSON file
    pub design: PathBuf,

    /// Requirements text the design should cover
    #[arg(short, long)]
    pub requirements: Option<PathBuf>,

    /// Directory of domain rule files (*.json) to check as well
    #[arg(long, value_name = "DIR")]
    pub domain_rules: Option<PathBuf>,

    /// Exit with a failure status when the design does not pass
    #[arg(long)]
    pub strict: bool,
}

/// Run the validate command.
pub async fn run(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let design = std::fs::read_to_string(&args.design)
        .with_context(|| format!("Failed to read design file {}", args.design.display()))?;
    let requirements = match &args.requirements {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read requirements file {}", path.display()))?,
        None => String::new(),
    };

    let engine = validation_engine(args.domain_rules.as_deref())?;
    let report = engine.run_all_str(&design, &requirements);

    if ctx.json_output {
        print_json(&report)?;
    } else {
        print_report(&report, ctx.verbose);
    }

    if args.strict && !report.passed {
        anyhow::bail!("Design failed validation (score {}/100)", report.score);
    }
    Ok(())
}

fn print_report(report: &ValidationReport, verbose: bool) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    let verdict = if report.passed {
        Style::new().green().bold()
    } else {
        Style::new().red().bold()
    };

    println!(
        "{} {}",
        bold.apply_to("Score:"),
        verdict.apply_to(format!("{}/100", report.score))
    );
    println!("{}", verdict.apply_to(&report.verdict));
    println!();

    let summary = &report.summary;
    println!(
        "{} critical, {} high, {} medium, {} low",
        summary.critical, summary.high, summary.medium, summary.low
    );

    if report.findings.is_empty() {
        return;
    }
    println!();
    for finding in &report.findings {
        let style = severity_style(finding.severity);
        let target = finding
            .component
            .as_deref()
            .or(finding.field.as_deref())
            .map(|t| format!(" [{t}]"))
            .unwrap_or_default();
        println!(
            "  {:<8} {}{} {}",
            style.apply_to(finding.severity.as_str().to_uppercase()),
            finding.code,
            dim.apply_to(target),
            finding.message
        );
        if let Some(suggestion) = &finding.suggestion {
            println!("           {}", dim.apply_to(format!("-> {suggestion}")));
        }
        if verbose && let Some(evidence) = &finding.evidence {
            println!("           {}", dim.apply_to(format!("evidence: {evidence}")));
        }
    }
}
