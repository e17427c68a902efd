//! Structural checks: required fields, types and recognised values.

use archadvisor_types::{Finding, FindingCode, Severity};
use serde_json::Value;

use crate::design::Design;
use crate::parse::parse_availability;
use crate::reference::ReferenceData;
use crate::validator::Validator;

pub const REQUIRED_KEYS: &[&str] = &[
    "overview",
    "architecture_style",
    "components",
    "non_functional",
    "tech_decisions",
    "deployment",
];

pub const VALID_STYLES: &[&str] = &[
    "event-driven",
    "event_driven",
    "hybrid",
    "microservices",
    "modular_monolith",
    "monolith",
    "serverless",
];

pub const VALID_CONSISTENCY: &[&str] = &["causal", "eventual", "strong"];

const COMPONENT_FIELDS: &[&str] = &["name", "type", "responsibility"];

/// Realistic availability range, in percent.
const AVAILABILITY_RANGE: (f64, f64) = (90.0, 99.9999);

pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn name(&self) -> &str {
        "schema"
    }

    fn check(&self, design: &Design<'_>, _requirements: &str, _: &ReferenceData) -> Vec<Finding> {
        let raw = design.raw();
        let Some(root) = raw.as_object() else {
            return vec![
                Finding::new(
                    FindingCode::SchemaInvalidType,
                    Severity::Critical,
                    "Architecture design must be a JSON object",
                )
                .with_suggestion("Return the design as a single JSON object"),
            ];
        };

        let mut findings = Vec::new();

        for key in REQUIRED_KEYS {
            if !root.contains_key(*key) {
                findings.push(
                    Finding::new(
                        FindingCode::SchemaMissingField,
                        Severity::Critical,
                        format!("Required field '{key}' is missing from architecture design"),
                    )
                    .with_field(*key)
                    .with_suggestion(format!("Add '{key}' to the architecture JSON")),
                );
            }
        }

        check_components(root.get("components"), &mut findings);
        check_style(root.get("architecture_style"), &mut findings);
        check_non_functional(root.get("non_functional"), &mut findings);

        for (i, decision) in design.decisions().iter().enumerate() {
            if decision.reasoning.trim().is_empty() {
                let label = if decision.decision.is_empty() {
                    "unknown"
                } else {
                    decision.decision
                };
                findings.push(
                    Finding::new(
                        FindingCode::SchemaMissingField,
                        Severity::Low,
                        format!("Tech decision #{} '{label}' has no reasoning", i + 1),
                    )
                    .with_field(format!("tech_decisions[{i}].reasoning"))
                    .with_suggestion("Justify every technology choice"),
                );
            }
        }

        findings
    }
}

fn check_components(components: Option<&Value>, findings: &mut Vec<Finding>) {
    let Some(components) = components else {
        return;
    };
    let Some(items) = components.as_array() else {
        findings.push(
            Finding::new(
                FindingCode::SchemaInvalidType,
                Severity::Critical,
                "'components' must be a list",
            )
            .with_field("components"),
        );
        return;
    };
    if items.is_empty() {
        findings.push(
            Finding::new(
                FindingCode::SchemaEmptyComponents,
                Severity::Critical,
                "'components' is empty; no architecture components defined",
            )
            .with_field("components")
            .with_suggestion("Define at least one component"),
        );
        return;
    }

    for (i, component) in items.iter().enumerate() {
        let Some(obj) = component.as_object() else {
            continue;
        };
        let label = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Component #{}", i + 1));
        for field in COMPONENT_FIELDS {
            if !obj.contains_key(*field) {
                findings.push(
                    Finding::new(
                        FindingCode::SchemaMissingField,
                        Severity::High,
                        format!("Component #{} is missing '{field}'", i + 1),
                    )
                    .with_component(label.clone())
                    .with_field(format!("components[{i}].{field}")),
                );
            }
        }
    }
}

fn check_style(style: Option<&Value>, findings: &mut Vec<Finding>) {
    let Some(style) = style.and_then(Value::as_str).filter(|s| !s.is_empty()) else {
        return;
    };
    let normalized = style.to_lowercase().replace(' ', "_");
    if !VALID_STYLES.contains(&normalized.as_str()) {
        findings.push(
            Finding::new(
                FindingCode::SchemaInvalidValue,
                Severity::Medium,
                format!("Architecture style '{style}' is not a recognized pattern"),
            )
            .with_field("architecture_style")
            .with_suggestion(format!("Use one of: {}", VALID_STYLES.join(", "))),
        );
    }
}

fn check_non_functional(nf: Option<&Value>, findings: &mut Vec<Finding>) {
    let Some(nf) = nf.and_then(Value::as_object) else {
        return;
    };

    if let Some(target) = nf.get("availability_target").filter(|v| !is_blank(v)) {
        let (low, high) = AVAILABILITY_RANGE;
        match parse_availability(target) {
            None => findings.push(
                Finding::new(
                    FindingCode::SchemaInvalidValue,
                    Severity::Medium,
                    format!("Cannot parse availability target: {target}"),
                )
                .with_field("non_functional.availability_target")
                .with_suggestion("Use a format like '99.99%' or '99.9%'"),
            ),
            Some(pct) if !(low..=high).contains(&pct) => findings.push(
                Finding::new(
                    FindingCode::SchemaInvalidValue,
                    Severity::Medium,
                    format!(
                        "Availability target {target} is outside the realistic range ({low}% to {high}%)"
                    ),
                )
                .with_field("non_functional.availability_target"),
            ),
            Some(_) => {}
        }
    }

    if let Some(model) = nf
        .get("data_consistency")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
    {
        if !VALID_CONSISTENCY.contains(&model.trim().to_lowercase().as_str()) {
            findings.push(
                Finding::new(
                    FindingCode::SchemaInvalidValue,
                    Severity::Medium,
                    format!("Data consistency model '{model}' is not recognized"),
                )
                .with_field("non_functional.data_consistency")
                .with_suggestion(format!("Use one of: {}", VALID_CONSISTENCY.join(", "))),
            );
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(raw: &Value) -> Vec<Finding> {
        SchemaValidator.check(&Design::new(raw), "", &ReferenceData::builtin())
    }

    fn codes(findings: &[Finding]) -> Vec<FindingCode> {
        findings.iter().map(|f| f.code.clone()).collect()
    }

    #[test]
    fn test_missing_required_keys_are_critical() {
        let findings = check(&json!({"overview": "x"}));
        assert_eq!(findings.len(), 5);
        assert!(findings.iter().all(|f| f.severity == Severity::Critical));
    }

    #[test]
    fn test_non_object_design() {
        let findings = check(&json!([1, 2, 3]));
        assert_eq!(codes(&findings), vec![FindingCode::SchemaInvalidType]);
    }

    #[test]
    fn test_component_shape() {
        let findings = check(&json!({"components": {"a": 1}}));
        assert!(codes(&findings).contains(&FindingCode::SchemaInvalidType));

        let findings = check(&json!({"components": []}));
        assert!(codes(&findings).contains(&FindingCode::SchemaEmptyComponents));

        let findings = check(&json!({"components": [{"name": "API"}]}));
        let high: Vec<_> = findings
            .iter()
            .filter(|f| f.severity == Severity::High)
            .collect();
        assert_eq!(high.len(), 2);
        assert_eq!(high[0].component.as_deref(), Some("API"));
        assert_eq!(high[0].field.as_deref(), Some("components[0].type"));
    }

    #[test]
    fn test_enumerated_values() {
        let findings = check(&json!({
            "architecture_style": "Big Ball Of Mud",
            "non_functional": {"availability_target": "eleven nines-ish", "data_consistency": "vibes"}
        }));
        let invalid = findings
            .iter()
            .filter(|f| f.code == FindingCode::SchemaInvalidValue)
            .count();
        assert_eq!(invalid, 3);
    }

    #[test]
    fn test_availability_out_of_range() {
        let findings = check(&json!({"non_functional": {"availability_target": "80%"}}));
        assert!(findings.iter().any(|f| f.message.contains("realistic range")));
    }

    #[test]
    fn test_decision_without_reasoning_is_low() {
        let findings = check(&json!({"tech_decisions": [{"decision": "Use Redis"}]}));
        let low: Vec<_> = findings
            .iter()
            .filter(|f| f.severity == Severity::Low)
            .collect();
        assert_eq!(low.len(), 1);
        assert!(low[0].message.contains("Use Redis"));
    }

    #[test]
    fn test_accepts_style_with_spaces() {
        let findings = check(&json!({"architecture_style": "Modular Monolith"}));
        assert!(!codes(&findings).contains(&FindingCode::SchemaInvalidValue));
    }
}
