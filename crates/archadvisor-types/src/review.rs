//! The reviewer's verdict on a design.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::Severity;

/// What the reviewer wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRecommendation {
    Proceed,
    ReviseCritical,
    ReviseRecommended,
}

impl ReviewRecommendation {
    pub fn wants_revision(self) -> bool {
        !matches!(self, ReviewRecommendation::Proceed)
    }
}

/// One issue raised in review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub severity: Severity,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ReviewFinding {
    pub fn new(severity: Severity, category: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            component: None,
            issue: issue.into(),
            suggestion: None,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

/// Review step output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub recommendation: ReviewRecommendation,
    #[serde(default)]
    pub findings: Vec<ReviewFinding>,
    /// Whatever else the reviewer returned, kept for the document step.
    #[serde(default)]
    pub raw: Value,
}

impl Review {
    pub fn new(recommendation: ReviewRecommendation) -> Self {
        Self {
            recommendation,
            findings: Vec::new(),
            raw: Value::Null,
        }
    }

    pub fn with_finding(mut self, finding: ReviewFinding) -> Self {
        self.findings.push(finding);
        self
    }

    pub fn critical_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count()
    }

    /// Findings ordered most severe first.
    pub fn ranked_findings(&self) -> Vec<&ReviewFinding> {
        let mut ranked: Vec<_> = self.findings.iter().collect();
        ranked.sort_by_key(|f| f.severity);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_wire_names() {
        let rec: ReviewRecommendation = serde_json::from_str("\"revise_critical\"").unwrap();
        assert_eq!(rec, ReviewRecommendation::ReviseCritical);
        assert!(rec.wants_revision());
        assert!(!ReviewRecommendation::Proceed.wants_revision());
    }

    #[test]
    fn test_ranked_findings() {
        let review = Review::new(ReviewRecommendation::ReviseRecommended)
            .with_finding(ReviewFinding::new(Severity::Low, "ops", "minor"))
            .with_finding(ReviewFinding::new(Severity::Critical, "data", "loss"));
        assert_eq!(review.critical_count(), 1);
        assert_eq!(review.ranked_findings()[0].issue, "loss");
    }
}
