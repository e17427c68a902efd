//! Mutually exclusive claims within one design.

use archadvisor_types::{Finding, FindingCode, Severity};

use crate::design::Design;
use crate::parse::{contains_any, first_match};
use crate::reference::ReferenceData;
use crate::validator::Validator;

const ORCHESTRATION_MARKERS: &[&str] = &["kubernetes", "k8s", "eks", "gke", "aks", "helm"];
const NF_MULTI_REGION_MARKERS: &[&str] = &["multi-region", "multi_region", "global", "cross-region"];
const STATELESS_MARKERS: &[&str] = &["stateless", "no shared state"];
const LOCAL_STATE_MARKERS: &[&str] = &[
    "local file",
    "in-memory state",
    "session storage",
    "local disk",
    "local storage",
];

/// A latency target at or below this is "low".
pub const LOW_LATENCY_MS: f64 = 100.0;
/// Synchronous service hops that a low latency target can't absorb.
pub const MANY_HOPS: usize = 6;
const MICROSERVICES_MIN_COMPONENTS: usize = 3;
const MONOLITH_MAX_COMPONENTS: usize = 9;

pub struct ContradictionValidator;

impl Validator for ContradictionValidator {
    fn name(&self) -> &str {
        "contradiction"
    }

    fn check(&self, design: &Design<'_>, _requirements: &str, reference: &ReferenceData) -> Vec<Finding> {
        let style = design.style();
        let mut findings = Vec::new();

        if style.contains("event") {
            let has_broker = contains_any(design.flat_text(), reference.message_brokers)
                || design.count_of("queue") > 0;
            if !has_broker {
                findings.push(
                    Finding::new(
                        FindingCode::ContraEventDrivenNoBroker,
                        Severity::Critical,
                        "Architecture style is event-driven but no message broker is present",
                    )
                    .with_field("architecture_style")
                    .with_suggestion("Add a broker: Kafka, RabbitMQ, SQS, Pulsar, or Redis Streams"),
                );
            }
        }

        if design.consistency() == "strong" {
            for tech in design.all_tech() {
                if let Some(db) = first_match(tech, reference.eventually_consistent_dbs) {
                    findings.push(
                        Finding::new(
                            FindingCode::ContraStrongConsistEventualDb,
                            Severity::Critical,
                            format!("Claims strong consistency but the tech stack includes {db}"),
                        )
                        .with_evidence(format!("tech: {tech}"))
                        .with_suggestion("Switch the datastore or change the consistency model to eventual"),
                    );
                }
            }
        }

        if style.contains("serverless") && contains_any(design.flat_text(), ORCHESTRATION_MARKERS) {
            findings.push(
                Finding::new(
                    FindingCode::ContraServerlessWithK8s,
                    Severity::High,
                    "Architecture style is serverless but Kubernetes is part of the design",
                )
                .with_suggestion("Choose one operating model: functions and managed runtimes, or container orchestration"),
            );
        }

        if let Some(latency) = design.latency_target_ms().filter(|ms| *ms <= LOW_LATENCY_MS) {
            let services = design.count_of("service");
            if services >= MANY_HOPS {
                findings.push(
                    Finding::new(
                        FindingCode::ContraLowLatencyManyHops,
                        Severity::High,
                        format!(
                            "Latency target is {latency}ms but the design has {services} services; each synchronous hop adds 5 to 20ms"
                        ),
                    )
                    .with_field("non_functional.latency_targets")
                    .with_suggestion("Shorten the synchronous chain with async processing, merged services, or caching")
                    .with_evidence(format!("estimated floor: {}ms", services * 5)),
                );
            }
        }

        if contains_any(&design.non_functional_text(), NF_MULTI_REGION_MARKERS) && design.region_count() <= 1 {
            findings.push(
                Finding::new(
                    FindingCode::ContraMultiRegionSingleDeploy,
                    Severity::High,
                    "Non-functional requirements call for multiple regions but deployment lists one",
                )
                .with_field("deployment.regions")
                .with_suggestion("List every region the non-functional requirements imply"),
            );
        }

        let components = design.components().len();
        if style.contains("microservice") && components < MICROSERVICES_MIN_COMPONENTS {
            findings.push(
                Finding::new(
                    FindingCode::ContraStyleMismatch,
                    Severity::Medium,
                    format!("Style is '{style}' but only {components} component(s) are defined; this is a monolith"),
                )
                .with_field("architecture_style")
                .with_suggestion("Add real service boundaries or call it a monolith"),
            );
        } else if style.contains("monolith") && components > MONOLITH_MAX_COMPONENTS {
            findings.push(
                Finding::new(
                    FindingCode::ContraStyleMismatch,
                    Severity::Medium,
                    format!("Style is '{style}' but {components} components are defined; this is microservices"),
                )
                .with_field("architecture_style")
                .with_suggestion("Call it microservices or consolidate components"),
            );
        }

        for component in design.components() {
            if contains_any(&component.text, STATELESS_MARKERS)
                && contains_any(&component.text, LOCAL_STATE_MARKERS)
            {
                findings.push(
                    Finding::new(
                        FindingCode::ContraStatelessWithLocalState,
                        Severity::High,
                        format!(
                            "'{}' claims to be stateless but keeps local state",
                            component.label()
                        ),
                    )
                    .with_component(component.label())
                    .with_suggestion("Move state to an external store or drop the stateless claim"),
                );
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn check(raw: &Value) -> Vec<FindingCode> {
        ContradictionValidator
            .check(&Design::new(raw), "", &ReferenceData::builtin())
            .into_iter()
            .map(|f| f.code.clone())
            .collect()
    }

    fn services(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"name": format!("svc-{i}"), "type": "service"}))
            .collect()
    }

    #[test]
    fn test_event_driven_needs_broker() {
        let raw = json!({"architecture_style": "event-driven", "components": services(3)});
        assert_eq!(check(&raw), vec![FindingCode::ContraEventDrivenNoBroker]);

        let mut with_kafka = services(3);
        with_kafka.push(json!({"name": "Bus", "type": "stream", "tech_stack": ["Kafka"]}));
        let raw = json!({"architecture_style": "event-driven", "components": with_kafka});
        assert!(check(&raw).is_empty());
    }

    #[test]
    fn test_serverless_with_kubernetes() {
        let raw = json!({
            "architecture_style": "serverless",
            "components": services(3),
            "deployment": {"platform": "EKS"}
        });
        assert_eq!(check(&raw), vec![FindingCode::ContraServerlessWithK8s]);
    }

    #[test]
    fn test_low_latency_many_hops() {
        let raw = json!({
            "architecture_style": "microservices",
            "components": services(6),
            "non_functional": {"latency_targets": {"p99": "80ms"}}
        });
        assert_eq!(check(&raw), vec![FindingCode::ContraLowLatencyManyHops]);

        let raw = json!({
            "architecture_style": "microservices",
            "components": services(5),
            "non_functional": {"latency_targets": {"p99": "80ms"}}
        });
        assert!(check(&raw).is_empty());
    }

    #[test]
    fn test_multi_region_claim_single_deploy() {
        let raw = json!({
            "non_functional": {"availability_target": "99.99% across multi-region"},
            "deployment": {"regions": ["us-east-1"]}
        });
        assert_eq!(check(&raw), vec![FindingCode::ContraMultiRegionSingleDeploy]);
    }

    #[test]
    fn test_style_mismatch_both_directions() {
        let raw = json!({"architecture_style": "microservices", "components": services(2)});
        assert_eq!(check(&raw), vec![FindingCode::ContraStyleMismatch]);

        let raw = json!({"architecture_style": "monolith", "components": services(10)});
        assert_eq!(check(&raw), vec![FindingCode::ContraStyleMismatch]);
    }

    #[test]
    fn test_stateless_with_local_state() {
        let raw = json!({
            "components": [{"name": "API", "type": "service", "responsibility": "stateless API keeping sessions in local storage"}]
        });
        assert_eq!(check(&raw), vec![FindingCode::ContraStatelessWithLocalState]);
    }
}
