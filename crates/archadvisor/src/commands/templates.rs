//! Templates command - lists the sample requirement templates.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use archadvisor_server::TEMPLATES;

use super::{Context, print_json};

/// Arguments for the templates command.
#[derive(Args, Debug)]
pub struct TemplatesArgs {
    /// Print the full requirements text of one template
    pub id: Option<String>,
}

/// Run the templates command.
pub async fn run(args: TemplatesArgs, ctx: &Context) -> Result<()> {
    if let Some(id) = args.id {
        let Some(template) = TEMPLATES.iter().find(|t| t.id == id) else {
            let known: Vec<&str> = TEMPLATES.iter().map(|t| t.id).collect();
            anyhow::bail!("Unknown template '{id}' (available: {})", known.join(", "));
        };
        if ctx.json_output {
            return print_json(template);
        }
        println!("{}", template.requirements);
        return Ok(());
    }

    if ctx.json_output {
        return print_json(&TEMPLATES);
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Requirement Templates").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    for template in &TEMPLATES {
        println!();
        println!(
            "  {} {}",
            style(template.id).cyan(),
            dim.apply_to(format!("({})", template.complexity))
        );
        println!("    {}", template.name);
        println!("    {}", dim.apply_to(template.description));
    }
    println!();
    println!(
        "  {}",
        dim.apply_to("Save one with: archadvisor templates <id> > requirements.txt")
    );
    println!();
    Ok(())
}
