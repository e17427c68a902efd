//! SPOF detection, composite availability and replication checks.

use archadvisor_types::{Finding, FindingCode, Severity};

use crate::design::{ComponentView, Design};
use crate::parse::{contains_any, mentions};
use crate::reference::ReferenceData;
use crate::validator::Validator;

pub const REDUNDANCY_MARKERS: &[&str] = &[
    "cluster",
    "replica",
    "multi-az",
    "multi_az",
    "multi-region",
    "failover",
    "standby",
    "sentinel",
    "replication",
    "redundant",
    "ha",
    "high availability",
    "active-passive",
    "active-active",
];

/// Override redundancy markers when both appear.
pub const SINGLE_INSTANCE_MARKERS: &[&str] = &[
    "single",
    "standalone",
    "one instance",
    "1 instance",
    "no replica",
];

const MULTI_ZONE_MARKERS: &[&str] = &[
    "multi-az",
    "multi_az",
    "multiple availability zones",
    "multi-region",
    "multi_region",
];

const REPLICATION_MARKERS: &[&str] = &[
    "replication",
    "replica",
    "standby",
    "follower",
    "secondary",
    "multi-master",
    "primary-secondary",
];

/// Composite math only runs for targets at or above this.
const COMPOSITE_MIN_TARGET: f64 = 99.0;
/// Targets at or above this need more than one zone.
const MULTI_ZONE_TARGET: f64 = 99.99;
/// Targets at or above this need replicated datastores, and make
/// database and gateway SPOFs critical.
const REPLICATION_TARGET: f64 = 99.9;

pub struct AvailabilityValidator;

impl Validator for AvailabilityValidator {
    fn name(&self) -> &str {
        "availability"
    }

    fn check(&self, design: &Design<'_>, _requirements: &str, reference: &ReferenceData) -> Vec<Finding> {
        let target = design.availability_target();
        let mut findings = spofs(design, target);

        if let Some(target) = target {
            if target >= COMPOSITE_MIN_TARGET {
                findings.extend(composite(design, target, reference));
            }
            if target >= MULTI_ZONE_TARGET {
                findings.extend(multi_zone(design, target));
            }
            if target >= REPLICATION_TARGET {
                findings.extend(replication(design, target));
            }
        }
        findings
    }
}

fn is_redundant(profile: &str) -> bool {
    contains_any(profile, REDUNDANCY_MARKERS) && !contains_any(profile, SINGLE_INSTANCE_MARKERS)
}

fn spofs(design: &Design<'_>, target: Option<f64>) -> Vec<Finding> {
    let strict = if target.is_some_and(|t| t >= REPLICATION_TARGET) {
        Severity::Critical
    } else {
        Severity::High
    };

    design
        .components()
        .iter()
        .filter_map(|c| {
            let profile = c.profile();
            if is_redundant(&profile) {
                return None;
            }
            let name = c.label();
            let finding = match c.kind.as_str() {
                "database" => Finding::new(
                    FindingCode::SpofDatabase,
                    strict,
                    format!("Database '{name}' appears to be a single instance with no replication"),
                )
                .with_suggestion("Add read replicas, a multi-AZ deployment, or clustering")
                .with_evidence(format!(
                    "No redundancy markers in: {}",
                    profile.chars().take(100).collect::<String>()
                )),
                "cache" => Finding::new(
                    FindingCode::SpofCache,
                    Severity::High,
                    format!("Cache '{name}' is a single instance; its failure cascades to the database"),
                )
                .with_suggestion("Use Redis Sentinel, Redis Cluster, or a managed cache with replicas"),
                "gateway" => Finding::new(
                    FindingCode::SpofGateway,
                    strict,
                    format!("Gateway '{name}' appears to be a single instance and all traffic routes through it"),
                )
                .with_suggestion("Use a managed gateway or run several instances behind a load balancer"),
                "queue" => Finding::new(
                    FindingCode::SpofQueue,
                    Severity::High,
                    format!("Queue '{name}' is a single instance; async processing halts on failure"),
                )
                .with_suggestion("Use a managed queue or a multi-broker cluster"),
                _ => return None,
            };
            Some(finding.with_component(name))
        })
        .collect()
}

/// Availability fraction for one component.
///
/// A declared `sla` wins. Otherwise the first matching technology estimate
/// is used, falling back to the type default, and redundancy squares out the
/// failure probability.
pub fn component_availability(component: &ComponentView<'_>, reference: &ReferenceData) -> f64 {
    if let Some(sla) = component.sla {
        return sla;
    }
    let identity = format!("{} {}", component.identity(), component.kind);
    let base = reference
        .availability
        .iter()
        .find(|(key, _)| mentions(&identity, key) || mentions(&identity, &key.replace('_', " ")))
        .map(|(_, avail)| *avail)
        .unwrap_or_else(|| ReferenceData::type_default_availability(&component.kind));

    if is_redundant(&component.profile()) {
        1.0 - (1.0 - base).powi(2)
    } else {
        base
    }
}

fn composite(design: &Design<'_>, target: f64, reference: &ReferenceData) -> Option<Finding> {
    let mut chain: Vec<(&str, f64)> = design
        .components()
        .iter()
        .map(|c| (c.label(), component_availability(c, reference)))
        .collect();
    if chain.len() < 2 {
        return None;
    }

    let composite_pct = chain.iter().map(|(_, a)| a).product::<f64>() * 100.0;
    if composite_pct >= target {
        return None;
    }

    chain.sort_by(|a, b| a.1.total_cmp(&b.1));
    let weakest = chain
        .iter()
        .take(3)
        .map(|(name, a)| format!("{name} ({:.3}%)", a * 100.0))
        .collect::<Vec<_>>()
        .join(", ");

    Some(
        Finding::new(
            FindingCode::AvailCompositeBelowTarget,
            Severity::Critical,
            format!(
                "Composite availability is {composite_pct:.2}%, below the target of {target}%. Weakest: {weakest}"
            ),
        )
        .with_field("non_functional.availability_target")
        .with_suggestion(
            "Add redundancy to the weakest components, use managed services with higher SLAs, or lower the target",
        )
        .with_evidence(format!("Computed from {} serial components", chain.len())),
    )
}

fn multi_zone(design: &Design<'_>, target: f64) -> Option<Finding> {
    if contains_any(design.flat_text(), MULTI_ZONE_MARKERS) || design.region_count() > 1 {
        return None;
    }
    Some(
        Finding::new(
            FindingCode::AvailSingleRegionHighSla,
            Severity::Critical,
            format!("Availability target {target}% needs multi-AZ or multi-region, but the design is single-zone"),
        )
        .with_field("deployment.regions")
        .with_suggestion("Deploy across at least two availability zones, or run active-passive across regions"),
    )
}

fn replication(design: &Design<'_>, target: f64) -> Vec<Finding> {
    design
        .components()
        .iter()
        .filter(|c| c.is("database") && !contains_any(&c.text, REPLICATION_MARKERS))
        .map(|c| {
            Finding::new(
                FindingCode::AvailNoReplication,
                Severity::High,
                format!(
                    "Database '{}' has no replication strategy for a {target}% target",
                    c.label()
                ),
            )
            .with_component(c.label())
            .with_suggestion("Specify primary-replica, multi-master, or a managed service with automatic replication")
        })
        .collect()
}
