//! Throughput feasibility, auto-scaling, sharding and hotspot checks.

use archadvisor_types::{Finding, FindingCode, Severity};

use crate::design::Design;
use crate::parse::contains_any;
use crate::reference::ReferenceData;
use crate::validator::Validator;

pub const AUTOSCALING_RPS: u64 = 10_000;
pub const SINGLE_NODE_RPS: u64 = 10_000;
pub const SHARDING_RPS: u64 = 20_000;
pub const HOTSPOT_RPS: u64 = 5_000;

const REPLICATED_SCALING: &[&str] = &["horizontal", "replica", "shard", "partition", "cluster"];

const AUTOSCALING_MARKERS: &[&str] = &[
    "auto-scaling",
    "autoscaling",
    "auto_scaling",
    "auto scaling",
    "horizontal scaling",
    "hpa",
    "keda",
    "target tracking",
    "scale out",
    "elastic scaling",
];

const SINGLE_NODE_MARKERS: &[&str] = &["single", "1 instance", "one instance", "standalone"];

const SHARDING_MARKERS: &[&str] = &[
    "shard",
    "partition",
    "hash ring",
    "consistent hash",
];

const WRITE_HEAVY_MARKERS: &[&str] = &["write-heavy", "write heavy", "all writes", "primary writer"];

pub struct CapacityValidator;

impl Validator for CapacityValidator {
    fn name(&self) -> &str {
        "capacity"
    }

    fn check(&self, design: &Design<'_>, _requirements: &str, reference: &ReferenceData) -> Vec<Finding> {
        let mut findings = Vec::new();

        if let Some(rps) = design.throughput().filter(|rps| *rps > 0) {
            findings.extend(benchmarks(design, rps, reference));
            if rps >= AUTOSCALING_RPS {
                findings.extend(autoscaling(design, rps));
            }
            if rps >= SINGLE_NODE_RPS {
                findings.extend(single_node(design, rps));
            }
            if rps >= HOTSPOT_RPS {
                findings.extend(sharding(design, rps));
            }
        }

        findings.extend(scaling_strategy(design));
        findings
    }
}

fn benchmarks(design: &Design<'_>, rps: u64, reference: &ReferenceData) -> Vec<Finding> {
    let mut findings = Vec::new();
    for component in design.components() {
        let replicated = contains_any(&component.scaling, REPLICATED_SCALING);
        for tech in &component.tech_stack {
            let tech = tech.replace(' ', "_");
            let Some(bench) = reference.benchmark_for(&tech) else {
                continue;
            };
            let ceiling = if replicated { bench.replicated() } else { bench.rps };
            if rps > ceiling {
                findings.push(
                    Finding::new(
                        FindingCode::CapThroughputExceedsBenchmark,
                        Severity::High,
                        format!(
                            "Declared throughput ({rps} RPS) exceeds the '{}' ceiling ({ceiling} RPS) in '{}'",
                            bench.key,
                            component.label()
                        ),
                    )
                    .with_component(component.label())
                    .with_suggestion(format!(
                        "Add horizontal scaling, replicas, or caching; a single '{}' node handles about {} RPS",
                        bench.key, bench.rps
                    ))
                    .with_evidence(format!(
                        "tech: {tech}, benchmark: {}, declared: {rps}, ceiling: {ceiling}",
                        bench.key
                    )),
                );
            }
        }
    }
    findings
}

fn autoscaling(design: &Design<'_>, rps: u64) -> Option<Finding> {
    if contains_any(design.flat_text(), AUTOSCALING_MARKERS) {
        return None;
    }
    Some(
        Finding::new(
            FindingCode::CapNoAutoscaling,
            Severity::High,
            format!("Declared throughput is {rps} RPS but no auto-scaling strategy is mentioned"),
        )
        .with_suggestion("Add auto-scaling: HPA on Kubernetes, target tracking on ECS, or a managed equivalent"),
    )
}

fn single_node(design: &Design<'_>, rps: u64) -> Vec<Finding> {
    design
        .components()
        .iter()
        .filter(|c| c.is("service") || c.is("gateway"))
        .filter(|c| {
            let text = format!("{} {} {}", c.label().to_lowercase(), c.kind, c.scaling);
            contains_any(&text, SINGLE_NODE_MARKERS)
        })
        .map(|c| {
            Finding::new(
                FindingCode::CapSingleNodeHighRps,
                Severity::Critical,
                format!("'{}' appears to be single-node but must handle {rps} RPS", c.label()),
            )
            .with_component(c.label())
            .with_suggestion("Run multiple instances behind a load balancer with auto-scaling")
        })
        .collect()
}

fn sharding(design: &Design<'_>, rps: u64) -> Vec<Finding> {
    let mut findings = Vec::new();
    for db in design.components().iter().filter(|c| c.is("database")) {
        if contains_any(&db.text, SHARDING_MARKERS) {
            continue;
        }
        if rps >= SHARDING_RPS {
            findings.push(
                Finding::new(
                    FindingCode::CapNoSharding,
                    Severity::High,
                    format!(
                        "Database '{}' has no sharding strategy at {rps} RPS declared throughput",
                        db.label()
                    ),
                )
                .with_component(db.label())
                .with_suggestion("Add hash or range partitioning, or use a natively distributed database"),
            );
        }
        if contains_any(&db.text, WRITE_HEAVY_MARKERS) {
            findings.push(
                Finding::new(
                    FindingCode::CapHotspotRisk,
                    Severity::Medium,
                    format!(
                        "Write-heavy database '{}' risks hotspots without partitioning",
                        db.label()
                    ),
                )
                .with_component(db.label())
                .with_suggestion("Spread writes with consistent hashing or application-level sharding"),
            );
        }
    }
    findings
}

fn scaling_strategy(design: &Design<'_>) -> Vec<Finding> {
    design
        .components()
        .iter()
        .filter(|c| (c.is("service") || c.is("gateway")) && c.scaling.trim().is_empty())
        .map(|c| {
            Finding::new(
                FindingCode::CapNoScalingStrategy,
                Severity::Medium,
                format!("'{}' has no scaling_strategy defined", c.label()),
            )
            .with_component(c.label())
            .with_suggestion("Specify horizontal, vertical, or auto-scaling")
        })
        .collect()
}
