//! Capabilities the requirements ask for that the design never addresses.

use archadvisor_types::Finding;

use crate::design::Design;
use crate::parse::{contains_any, first_match};
use crate::reference::ReferenceData;
use crate::validator::Validator;

pub struct CoverageValidator;

impl Validator for CoverageValidator {
    fn name(&self) -> &str {
        "coverage"
    }

    fn check(&self, design: &Design<'_>, requirements: &str, reference: &ReferenceData) -> Vec<Finding> {
        let requirements = requirements.to_lowercase();
        if requirements.trim().is_empty() {
            return Vec::new();
        }

        reference
            .requirement_rules
            .iter()
            .filter_map(|rule| {
                let asked = first_match(&requirements, rule.keywords)?;
                if contains_any(design.flat_text(), rule.keywords) {
                    return None;
                }
                Some(
                    Finding::new(
                        rule.code.clone(),
                        rule.severity,
                        format!(
                            "Requirements mention '{asked}' but the design has no {} component or strategy",
                            rule.name
                        ),
                    )
                    .with_suggestion(format!("Add a {} component or address it explicitly", rule.name))
                    .with_evidence(format!("'{asked}' found in requirements but not in the design")),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archadvisor_types::{FindingCode, Severity};
    use serde_json::json;

    fn check(raw: &serde_json::Value, requirements: &str) -> Vec<Finding> {
        CoverageValidator.check(&Design::new(raw), requirements, &ReferenceData::builtin())
    }

    #[test]
    fn test_missing_auth_is_high() {
        let raw = json!({"components": [{"name": "API", "type": "service"}]});
        let findings = check(&raw, "Users log in with SSO before placing orders");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, FindingCode::MissingAuth);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].message.contains("'sso'"));
    }

    #[test]
    fn test_addressed_anywhere_in_design() {
        let raw = json!({
            "components": [{"name": "API", "type": "service"}],
            "tech_decisions": [{"decision": "OAuth2 via Cognito", "reasoning": "managed identity"}]
        });
        assert!(check(&raw, "needs authentication").is_empty());
    }

    #[test]
    fn test_medium_capabilities() {
        let raw = json!({"components": []});
        let codes: Vec<_> = check(&raw, "Customers search the catalog and get a push notification")
            .into_iter()
            .map(|f| (f.code.clone(), f.severity))
            .collect();
        assert!(codes.contains(&(FindingCode::MissingSearch, Severity::Medium)));
        assert!(codes.contains(&(FindingCode::MissingNotification, Severity::Medium)));
    }

    #[test]
    fn test_short_keyword_needs_whole_word() {
        let raw = json!({"components": []});
        // "address" and "drive" must not read as a DR requirement
        assert!(check(&raw, "drive traffic to the address book").is_empty());
        let findings = check(&raw, "We need a DR plan with 15 minute RPO");
        assert_eq!(findings[0].code, FindingCode::MissingDr);
    }

    #[test]
    fn test_no_requirements_no_findings() {
        assert!(check(&json!({}), "   ").is_empty());
    }
}
