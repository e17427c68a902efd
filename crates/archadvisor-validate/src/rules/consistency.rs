//! Data consistency model checks.

use archadvisor_types::{Finding, FindingCode, Severity};

use crate::design::Design;
use crate::parse::{contains_any, first_match};
use crate::reference::ReferenceData;
use crate::validator::Validator;

const JUSTIFICATION_MARKERS: &[&str] = &[
    "eventual",
    "consistency",
    "cap theorem",
    "trade-off",
    "tradeoff",
    "availability over consistency",
];

pub const MULTI_REGION_MARKERS: &[&str] = &[
    "multi-region",
    "multi_region",
    "cross-region",
    "geo-distributed",
    "global deployment",
    "multiple regions",
];

pub struct ConsistencyValidator;

impl Validator for ConsistencyValidator {
    fn name(&self) -> &str {
        "consistency"
    }

    fn check(&self, design: &Design<'_>, _requirements: &str, reference: &ReferenceData) -> Vec<Finding> {
        let model = design.consistency();
        if model.is_empty() {
            return vec![
                Finding::new(
                    FindingCode::ConsistMissingStrategy,
                    Severity::Medium,
                    "No data consistency strategy declared in non_functional",
                )
                .with_field("non_functional.data_consistency")
                .with_suggestion("Specify 'strong', 'eventual', or 'causal'"),
            ];
        }

        let mut findings = Vec::new();
        match model.as_str() {
            "eventual" => findings.extend(eventual_justified(design)),
            "strong" => {
                findings.extend(strong_multi_region(design));
                findings.extend(strong_with_eventual_db(design, reference));
            }
            _ => {}
        }
        findings
    }
}

fn eventual_justified(design: &Design<'_>) -> Option<Finding> {
    let justified = design.decisions().iter().any(|d| {
        let text = format!("{} {}", d.decision, d.reasoning).to_lowercase();
        contains_any(&text, JUSTIFICATION_MARKERS)
    });
    if justified {
        return None;
    }
    Some(
        Finding::new(
            FindingCode::ConsistEventualNoJustification,
            Severity::Medium,
            "Eventual consistency declared but not justified in tech_decisions",
        )
        .with_field("non_functional.data_consistency")
        .with_suggestion(
            "Add a tech decision explaining the choice: CAP trade-off, latency needs, or a read-heavy workload",
        ),
    )
}

/// Whether the design spans more than one region.
pub fn is_multi_region(design: &Design<'_>) -> bool {
    design.region_count() > 1 || contains_any(design.flat_text(), MULTI_REGION_MARKERS)
}

fn strong_multi_region(design: &Design<'_>) -> Option<Finding> {
    if !is_multi_region(design) {
        return None;
    }
    Some(
        Finding::new(
            FindingCode::ConsistStrongMultiRegionLatency,
            Severity::High,
            "Strong consistency across regions adds 50 to 200ms of consensus latency to every write",
        )
        .with_field("non_functional.data_consistency")
        .with_suggestion(
            "Consider causal consistency with conflict resolution, a single leader with regional read replicas, or eventual consistency with compensation",
        ),
    )
}

fn strong_with_eventual_db(design: &Design<'_>, reference: &ReferenceData) -> Vec<Finding> {
    design
        .components()
        .iter()
        .filter(|c| c.is("database"))
        .filter_map(|c| {
            let db = first_match(&c.identity(), reference.eventually_consistent_dbs)?;
            Some(
                Finding::new(
                    FindingCode::ConsistStrongWithEventualDb,
                    Severity::Critical,
                    format!(
                        "Design claims strong consistency but '{}' uses {db}, which is eventually consistent by default",
                        c.label()
                    ),
                )
                .with_component(c.label())
                .with_suggestion(format!(
                    "Switch to a strongly consistent store, relax the model to eventual, or configure {db} for strongly consistent reads"
                )),
            )
        })
        .collect()
}
