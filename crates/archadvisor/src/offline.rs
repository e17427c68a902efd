//! Offline step handlers.
//!
//! The server normally delegates design, review, costing and documentation
//! to external reasoning services. These handlers stand in for them with
//! deterministic rules so `archadvisor start` runs the whole pipeline end to
//! end on a single machine: the architect derives a baseline design from the
//! requirements text, the reviewer relays what validation still reports, the
//! cost analyzer prices components from a flat table, and the documenter
//! renders everything into markdown with one Mermaid diagram.

use std::fmt::Write as _;
use std::sync::Arc;

use archadvisor_pipeline::{StepContext, StepError, StepHandler, StepHandlers, StepOutput};
use archadvisor_types::{
    Agent, CloudProvider, Diagram, EventKind, Review, ReviewFinding, ReviewRecommendation, Run,
};
use archadvisor_validate::ReferenceData;
use archadvisor_validate::parse::first_match;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Model name recorded on every message these handlers produce.
pub const OFFLINE_MODEL: &str = "offline-rules";

/// Review notes relayed from the last validation report.
const MAX_RELAYED_FINDINGS: usize = 5;

/// Handlers for all four reasoning steps.
pub fn handlers() -> StepHandlers {
    StepHandlers::new(
        Arc::new(OfflineArchitect),
        Arc::new(OfflineReviewer),
        Arc::new(OfflineCostAnalyzer),
        Arc::new(OfflineDocumenter),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Architect
// ─────────────────────────────────────────────────────────────────────────────

pub struct OfflineArchitect;

#[async_trait]
impl StepHandler for OfflineArchitect {
    fn name(&self) -> &str {
        "offline-architect"
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        let design = baseline_design(&ctx.run.requirements, ctx.run.preferences.cloud_provider);
        let components = design["components"].as_array().map_or(0, Vec::len);
        ctx.events.publish(EventKind::thinking(
            Agent::Architect,
            format!("Derived {components} components from the requirements"),
        ));

        let summary = match ctx.step.as_str() {
            "design" => format!("Baseline design with {components} components"),
            step => format!("Baseline design re-derived for {step}"),
        };
        Ok(StepOutput::design(design)
            .with_summary(summary)
            .with_model(OFFLINE_MODEL))
    }
}

/// Cloud regions the baseline deploys to.
fn regions(provider: CloudProvider) -> Vec<&'static str> {
    match provider {
        CloudProvider::Aws => vec!["us-east-1"],
        CloudProvider::Gcp => vec!["us-central1"],
        CloudProvider::Azure => vec!["eastus"],
        CloudProvider::All => vec!["us-east-1", "us-central1"],
    }
}

/// Component that covers one capability the requirements ask for.
fn capability_component(capability: &str, keyword: &str) -> Value {
    let (kind, tech, scaling) = match capability {
        "caching" => (
            "cache",
            "Redis",
            "Redis Cluster with replicas across availability zones",
        ),
        "search" => (
            "search",
            "OpenSearch",
            "Three-node cluster with one replica per shard",
        ),
        "notification" => (
            "queue",
            "RabbitMQ",
            "Quorum queues on a three-node cluster",
        ),
        _ => ("service", "Go", "Horizontal auto-scaling"),
    };
    let mut name = capability.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    json!({
        "name": format!("{name} Service"),
        "type": kind,
        "responsibility": format!("Provides {capability} ({keyword})"),
        "tech_stack": [tech],
        "scaling_strategy": scaling,
        "sla": "99.99%"
    })
}

/// Derive a baseline design from free-text requirements.
///
/// Always includes a gateway, an application service and a replicated
/// database; adds one component for each capability the requirements
/// mention.
pub fn baseline_design(requirements: &str, provider: CloudProvider) -> Value {
    let text = requirements.to_lowercase();
    let mut components = vec![
        json!({
            "name": "API Gateway",
            "type": "gateway",
            "responsibility": "Routes and authenticates client traffic",
            "tech_stack": ["Envoy"],
            "scaling_strategy": "Redundant instances behind a load balancer, horizontal auto-scaling",
            "sla": "99.99%"
        }),
        json!({
            "name": "Application Service",
            "type": "service",
            "responsibility": "Core business logic",
            "tech_stack": ["Go"],
            "scaling_strategy": "Horizontal auto-scaling",
            "sla": "99.99%"
        }),
        json!({
            "name": "Primary Database",
            "type": "database",
            "responsibility": "Durable system of record",
            "tech_stack": ["PostgreSQL"],
            "scaling_strategy": "Primary with read replica, multi-AZ failover",
            "sla": "99.99%"
        }),
    ];

    let mut decisions = vec![json!({
        "decision": "PostgreSQL as the system of record",
        "reasoning": "Relational integrity and mature replication"
    })];

    for rule in ReferenceData::builtin().requirement_rules {
        if let Some(keyword) = first_match(&text, rule.keywords) {
            components.push(capability_component(rule.name, keyword));
            decisions.push(json!({
                "decision": format!("Dedicated {} component", rule.name),
                "reasoning": format!("Requirements mention '{keyword}'")
            }));
        }
    }

    let overview: String = requirements
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Baseline architecture")
        .chars()
        .take(200)
        .collect();

    json!({
        "overview": overview,
        "architecture_style": "microservices",
        "components": components,
        "non_functional": {
            "availability_target": "99.9%",
            "data_consistency": "strong",
            "latency_targets": {"p50": "50ms", "p99": "300ms"}
        },
        "tech_decisions": decisions,
        "deployment": {"regions": regions(provider), "strategy": "multi-az"}
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Reviewer
// ─────────────────────────────────────────────────────────────────────────────

pub struct OfflineReviewer;

#[async_trait]
impl StepHandler for OfflineReviewer {
    fn name(&self) -> &str {
        "offline-reviewer"
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        Ok(StepOutput::review(relay_review(&ctx.run)).with_model(OFFLINE_MODEL))
    }
}

/// Approve the design, carrying the highest remaining validation findings
/// forward as review notes.
pub fn relay_review(run: &Run) -> Review {
    let mut review = Review::new(ReviewRecommendation::Proceed);
    if let Some(report) = &run.validation_report {
        for finding in report.findings.iter().take(MAX_RELAYED_FINDINGS) {
            let mut note =
                ReviewFinding::new(finding.severity, finding.category().as_str(), &finding.message);
            if let Some(component) = &finding.component {
                note = note.with_component(component);
            }
            review = review.with_finding(note);
        }
    }
    review
}

// ─────────────────────────────────────────────────────────────────────────────
// Cost analyzer
// ─────────────────────────────────────────────────────────────────────────────

/// Flat monthly price per component type, in USD.
fn monthly_price(kind: &str) -> u64 {
    match kind {
        "database" => 900,
        "cache" => 350,
        "queue" => 300,
        "search" => 600,
        "gateway" => 250,
        _ => 400,
    }
}

pub struct OfflineCostAnalyzer;

#[async_trait]
impl StepHandler for OfflineCostAnalyzer {
    fn name(&self) -> &str {
        "offline-cost-analyzer"
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        let analysis = estimate_costs(ctx.run.current_design.as_ref().unwrap_or(&Value::Null));
        let total = analysis["monthly_usd"].as_u64().unwrap_or(0);
        Ok(StepOutput::cost_analysis(analysis)
            .with_summary(format!("Estimated ${total}/month"))
            .with_model(OFFLINE_MODEL))
    }
}

pub fn estimate_costs(design: &Value) -> Value {
    let components = design
        .get("components")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let breakdown: Vec<Value> = components
        .iter()
        .map(|c| {
            let kind = c.get("type").and_then(Value::as_str).unwrap_or("service");
            json!({
                "component": c.get("name").and_then(Value::as_str).unwrap_or("unnamed"),
                "monthly_usd": monthly_price(kind),
            })
        })
        .collect();
    let total: u64 = breakdown
        .iter()
        .filter_map(|b| b["monthly_usd"].as_u64())
        .sum();

    json!({"monthly_usd": total, "breakdown": breakdown})
}

// ─────────────────────────────────────────────────────────────────────────────
// Documenter
// ─────────────────────────────────────────────────────────────────────────────

pub struct OfflineDocumenter;

#[async_trait]
impl StepHandler for OfflineDocumenter {
    fn name(&self) -> &str {
        "offline-documenter"
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        let (markdown, diagram) = render_document(&ctx.run);
        Ok(StepOutput::document(markdown, vec![diagram]).with_model(OFFLINE_MODEL))
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Markdown summary of a run plus a component diagram.
pub fn render_document(run: &Run) -> (String, Diagram) {
    let design = run.current_design.clone().unwrap_or(Value::Null);
    let components = design
        .get("components")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut md = String::new();
    let _ = writeln!(md, "# Architecture: {}\n", str_field(&design, "overview"));
    let _ = writeln!(md, "Style: {}\n", str_field(&design, "architecture_style"));

    md.push_str("## Components\n\n| Name | Type | Responsibility | Scaling |\n|---|---|---|---|\n");
    for c in &components {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            str_field(c, "name"),
            str_field(c, "type"),
            str_field(c, "responsibility"),
            str_field(c, "scaling_strategy"),
        );
    }

    if let Some(report) = &run.validation_report {
        let _ = writeln!(md, "\n## Validation\n\n{}\n", report.verdict);
        for f in &report.findings {
            let _ = writeln!(md, "- **{}** `{}`: {}", f.severity, f.code, f.message);
        }
    }

    if let Some(review) = &run.review {
        let _ = writeln!(md, "\n## Review\n\nRecommendation: {:?}\n", review.recommendation);
        for f in review.ranked_findings() {
            let _ = writeln!(md, "- **{}** ({}): {}", f.severity, f.category, f.issue);
        }
    }

    if let Some(cost) = &run.cost_analysis {
        let total = cost.get("monthly_usd").and_then(Value::as_u64).unwrap_or(0);
        let _ = writeln!(md, "\n## Cost\n\nEstimated monthly cost: ${total}");
    }

    if run.validation_incomplete {
        md.push_str("\n> Validation did not pass within the allowed revision rounds.\n");
    }
    if run.debate_unresolved {
        md.push_str("\n> The review debate ended with findings still open.\n");
    }

    let mut mermaid = String::from("graph TD\n");
    for (i, c) in components.iter().enumerate() {
        let _ = writeln!(mermaid, "    C{i}[\"{}\"]", str_field(c, "name"));
    }
    // Gateway fans out to everything behind it.
    for i in 1..components.len() {
        let _ = writeln!(mermaid, "    C0 --> C{i}");
    }

    let diagram = Diagram {
        kind: "architecture".to_string(),
        title: "Component overview".to_string(),
        mermaid_code: mermaid,
    };
    (md, diagram)
}

#[cfg(test)]
mod tests {
    use super::*;
    use archadvisor_types::{RunId, RunPatch, RunRequest, Severity};
    use archadvisor_validate::ValidationEngine;

    const REQUIREMENTS: &str = "Design a chat platform with login via OAuth, full-text search \
                                over history, and a cache for low latency timelines.";

    fn run_with_design() -> Run {
        let mut run = Run::new(RunId::generate(), RunRequest::new(REQUIREMENTS));
        let design = baseline_design(REQUIREMENTS, CloudProvider::Aws);
        let report = ValidationEngine::new().run_all(&design, REQUIREMENTS);
        RunPatch::new()
            .with_design(design.clone())
            .with_validation_report(report)
            .with_cost_analysis(estimate_costs(&design))
            .apply(&mut run);
        run
    }

    #[test]
    fn test_baseline_covers_requested_capabilities() {
        let design = baseline_design(REQUIREMENTS, CloudProvider::Aws);
        let names: Vec<&str> = design["components"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"Authentication Service"));
        assert!(names.contains(&"Search Service"));
        assert!(names.contains(&"Caching Service"));
        assert_eq!(design["deployment"]["regions"], json!(["us-east-1"]));
    }

    #[test]
    fn test_baseline_passes_validation() {
        let design = baseline_design(REQUIREMENTS, CloudProvider::Aws);
        let report = ValidationEngine::new().run_all(&design, REQUIREMENTS);
        assert!(report.passed, "{report:#?}");
        assert!(!report.has_critical());
    }

    #[test]
    fn test_review_relays_validation_findings() {
        let run = run_with_design();
        let review = relay_review(&run);
        assert_eq!(review.recommendation, ReviewRecommendation::Proceed);
        let relayed = run.validation_report.as_ref().unwrap().findings.len();
        assert_eq!(review.findings.len(), relayed.min(MAX_RELAYED_FINDINGS));
        assert!(review.findings.iter().all(|f| f.severity != Severity::Critical));
    }

    #[test]
    fn test_costs_sum_breakdown() {
        let design = json!({"components": [
            {"name": "DB", "type": "database"},
            {"name": "API", "type": "service"}
        ]});
        let cost = estimate_costs(&design);
        assert_eq!(cost["monthly_usd"], 1300);
        assert_eq!(cost["breakdown"].as_array().unwrap().len(), 2);
        assert_eq!(estimate_costs(&Value::Null)["monthly_usd"], 0);
    }

    #[test]
    fn test_document_renders_sections() {
        let (markdown, diagram) = render_document(&run_with_design());
        assert!(markdown.starts_with("# Architecture: Design a chat platform"));
        assert!(markdown.contains("| Primary Database | database |"));
        assert!(markdown.contains("## Validation"));
        assert!(markdown.contains("Estimated monthly cost: $"));
        assert!(diagram.mermaid_code.starts_with("graph TD"));
        assert!(diagram.mermaid_code.contains("C0 --> C2"));
    }
}
