//! Over-engineering heuristics relative to declared scale.

use archadvisor_types::{Finding, FindingCode, Severity};

use crate::design::Design;
use crate::parse::{contains_any, mentions};
use crate::reference::ReferenceData;
use crate::validator::Validator;

const SMALL_SCALE_MARKERS: &[&str] = &[
    "mvp",
    "prototype",
    "proof of concept",
    "poc",
    "small",
    "startup",
    "simple",
];

pub const MAX_COMPONENTS: usize = 15;
const MANY_SERVICES: usize = 8;
const LOW_RPS: u64 = 5_000;
const VERY_LOW_RPS: u64 = 1_000;
const STREAMING_MIN_RPS: u64 = 10_000;
const MULTI_REGION_MIN: usize = 3;
const MULTI_REGION_JUSTIFIED_TARGET: f64 = 99.99;
const ENTERPRISE_LIMIT: usize = 3;

pub struct ComplexityValidator;

impl Validator for ComplexityValidator {
    fn name(&self) -> &str {
        "complexity"
    }

    fn check(&self, design: &Design<'_>, requirements: &str, reference: &ReferenceData) -> Vec<Finding> {
        let requirements = requirements.to_lowercase();
        let small = contains_any(&requirements, SMALL_SCALE_MARKERS);
        let rps = design.throughput();
        let low_rps = rps.is_some_and(|r| r < LOW_RPS);

        let mut findings = Vec::new();
        findings.extend(service_count(design, rps, small));
        findings.extend(streaming_overkill(design, rps));
        findings.extend(multi_region_overkill(design, small, low_rps));
        if small || low_rps {
            findings.extend(enterprise_overkill(design, small, reference));
        }
        findings
    }
}

fn service_count(design: &Design<'_>, rps: Option<u64>, small: bool) -> Option<Finding> {
    let total = design.components().len();
    if total > MAX_COMPONENTS {
        return Some(
            Finding::new(
                FindingCode::OpsTooManyServices,
                Severity::High,
                format!("{total} components is operationally expensive to run and maintain"),
            )
            .with_suggestion("Consolidate along bounded contexts; not every entity needs its own service"),
        );
    }

    let services = design.count_of("service");
    let very_low = rps.is_some_and(|r| r < VERY_LOW_RPS);
    let modest = rps.is_none_or(|r| r < LOW_RPS);
    if services >= MANY_SERVICES && modest && (small || very_low) {
        let scale = if very_low { "under 1K RPS" } else { "a small system" };
        return Some(
            Finding::new(
                FindingCode::OpsTooManyServices,
                Severity::Medium,
                format!("{services} services for {scale}; microservice overhead may outweigh the benefit"),
            )
            .with_suggestion("Start with a modular monolith and extract services as load demands"),
        );
    }
    None
}

fn streaming_overkill(design: &Design<'_>, rps: Option<u64>) -> Option<Finding> {
    let rps = rps.filter(|r| *r < STREAMING_MIN_RPS)?;
    let has_kafka = ["kafka", "msk"]
        .iter()
        .any(|kw| mentions(design.flat_text(), kw));
    if !has_kafka {
        return None;
    }
    Some(
        Finding::new(
            FindingCode::OpsKafkaLowThroughput,
            Severity::Medium,
            format!(
                "Kafka is included but throughput is only {rps} RPS; its brokers and partitions are not justified below about 10K messages/sec"
            ),
        )
        .with_suggestion("Consider Redis Streams, RabbitMQ, or a managed queue such as SQS"),
    )
}

fn multi_region_overkill(design: &Design<'_>, small: bool, low_rps: bool) -> Option<Finding> {
    let regions = design.region_count();
    let target_allows = design
        .availability_target()
        .is_some_and(|t| t < MULTI_REGION_JUSTIFIED_TARGET);
    if regions < MULTI_REGION_MIN || !(small || low_rps) || !target_allows {
        return None;
    }
    let scale = if small { "an MVP or startup" } else { "a low-throughput" };
    Some(
        Finding::new(
            FindingCode::OpsMultiRegionMvp,
            Severity::Medium,
            format!("{regions}-region deployment for {scale} system"),
        )
        .with_field("deployment.regions")
        .with_suggestion("Start single-region multi-AZ and add regions for latency or regulatory needs"),
    )
}

fn enterprise_overkill(design: &Design<'_>, small: bool, reference: &ReferenceData) -> Option<Finding> {
    let used: Vec<&str> = design
        .all_tech()
        .flat_map(|tech| {
            reference
                .enterprise_services
                .iter()
                .copied()
                .filter(move |svc| mentions(tech, svc))
        })
        .collect();
    if used.len() < ENTERPRISE_LIMIT {
        return None;
    }
    let scale = if small { "small-scale" } else { "low-throughput" };
    let listed = used.iter().take(5).copied().collect::<Vec<_>>().join(", ");
    Some(
        Finding::new(
            FindingCode::OpsEnterpriseForStartup,
            Severity::Medium,
            format!("{} enterprise-grade services ({listed}) for a {scale} system", used.len()),
        )
        .with_suggestion("Right-size: PostgreSQL over Aurora, Compose over Kubernetes, SQS over Kafka"),
    )
}
