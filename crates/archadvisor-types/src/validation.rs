//! Validator findings and the report they roll up into.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Severity
// ─────────────────────────────────────────────────────────────────────────────

/// How serious a finding is. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Points removed from the 100-point score per finding.
    pub fn deduction(self) -> u32 {
        match self {
            Severity::Critical => 30,
            Severity::High => 15,
            Severity::Medium => 5,
            Severity::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Finding codes
// ─────────────────────────────────────────────────────────────────────────────

/// Which validator a finding code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Schema,
    Availability,
    Capacity,
    Consistency,
    Contradiction,
    Complexity,
    Coverage,
    DomainPattern,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Schema => "schema",
            Category::Availability => "availability",
            Category::Capacity => "capacity",
            Category::Consistency => "consistency",
            Category::Contradiction => "contradiction",
            Category::Complexity => "complexity",
            Category::Coverage => "coverage",
            Category::DomainPattern => "domain_pattern",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! finding_codes {
    ($($variant:ident => $wire:literal, $category:ident;)+) => {
        /// Finding codes: the closed vocabulary of the built-in validators,
        /// plus pattern ids from domain rule files.
        ///
        /// On the wire every code is its bare name, e.g. `SPOF_DATABASE`.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum FindingCode {
            $($variant,)+
            /// A pattern id from a domain rule file.
            Domain(String),
        }

        impl FindingCode {
            /// Wire name.
            pub fn as_str(&self) -> &str {
                match self {
                    $(FindingCode::$variant => $wire,)+
                    FindingCode::Domain(id) => id,
                }
            }

            /// The validator this code belongs to.
            pub fn category(&self) -> Category {
                match self {
                    $(FindingCode::$variant => Category::$category,)+
                    FindingCode::Domain(_) => Category::DomainPattern,
                }
            }

            /// Parse a wire name. Names outside the built-in vocabulary are
            /// domain pattern ids.
            pub fn from_wire(code: &str) -> Self {
                match code {
                    $($wire => FindingCode::$variant,)+
                    other => FindingCode::Domain(other.to_string()),
                }
            }
        }
    };
}

finding_codes! {
    SchemaMissingField => "SCHEMA_MISSING_FIELD", Schema;
    SchemaInvalidType => "SCHEMA_INVALID_TYPE", Schema;
    SchemaInvalidValue => "SCHEMA_INVALID_VALUE", Schema;
    SchemaEmptyComponents => "SCHEMA_EMPTY_COMPONENTS", Schema;

    SpofDatabase => "SPOF_DATABASE", Availability;
    SpofCache => "SPOF_CACHE", Availability;
    SpofGateway => "SPOF_GATEWAY", Availability;
    SpofQueue => "SPOF_QUEUE", Availability;
    AvailCompositeBelowTarget => "AVAIL_COMPOSITE_BELOW_TARGET", Availability;
    AvailSingleRegionHighSla => "AVAIL_SINGLE_REGION_HIGH_SLA", Availability;
    AvailNoReplication => "AVAIL_NO_REPLICATION", Availability;

    CapThroughputExceedsBenchmark => "CAP_THROUGHPUT_EXCEEDS_BENCHMARK", Capacity;
    CapNoAutoscaling => "CAP_NO_AUTOSCALING", Capacity;
    CapSingleNodeHighRps => "CAP_SINGLE_NODE_HIGH_RPS", Capacity;
    CapNoSharding => "CAP_NO_SHARDING", Capacity;
    CapHotspotRisk => "CAP_HOTSPOT_RISK", Capacity;
    CapNoScalingStrategy => "CAP_NO_SCALING_STRATEGY", Capacity;

    ConsistMissingStrategy => "CONSIST_MISSING_STRATEGY", Consistency;
    ConsistEventualNoJustification => "CONSIST_EVENTUAL_NO_JUSTIFICATION", Consistency;
    ConsistStrongMultiRegionLatency => "CONSIST_STRONG_MULTI_REGION_LATENCY", Consistency;
    ConsistStrongWithEventualDb => "CONSIST_STRONG_WITH_EVENTUAL_DB", Consistency;

    ContraEventDrivenNoBroker => "CONTRA_EVENT_DRIVEN_NO_BROKER", Contradiction;
    ContraStrongConsistEventualDb => "CONTRA_STRONG_CONSIST_EVENTUAL_DB", Contradiction;
    ContraServerlessWithK8s => "CONTRA_SERVERLESS_WITH_K8S", Contradiction;
    ContraLowLatencyManyHops => "CONTRA_LOW_LATENCY_MANY_HOPS", Contradiction;
    ContraMultiRegionSingleDeploy => "CONTRA_MULTI_REGION_SINGLE_DEPLOY", Contradiction;
    ContraStyleMismatch => "CONTRA_STYLE_MISMATCH", Contradiction;
    ContraStatelessWithLocalState => "CONTRA_STATELESS_WITH_LOCAL_STATE", Contradiction;

    OpsTooManyServices => "OPS_TOO_MANY_SERVICES", Complexity;
    OpsKafkaLowThroughput => "OPS_KAFKA_LOW_THROUGHPUT", Complexity;
    OpsMultiRegionMvp => "OPS_MULTI_REGION_MVP", Complexity;
    OpsEnterpriseForStartup => "OPS_ENTERPRISE_FOR_STARTUP", Complexity;

    MissingAuth => "MISSING_AUTH", Coverage;
    MissingAnalytics => "MISSING_ANALYTICS", Coverage;
    MissingDr => "MISSING_DR", Coverage;
    MissingMonitoring => "MISSING_MONITORING", Coverage;
    MissingEncryption => "MISSING_ENCRYPTION", Coverage;
    MissingRateLimiting => "MISSING_RATE_LIMITING", Coverage;
    MissingSearch => "MISSING_SEARCH", Coverage;
    MissingNotification => "MISSING_NOTIFICATION", Coverage;
    MissingCaching => "MISSING_CACHING", Coverage;
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FindingCode {
    fn from(code: String) -> Self {
        FindingCode::from_wire(&code)
    }
}

impl From<FindingCode> for String {
    fn from(code: FindingCode) -> Self {
        match code {
            FindingCode::Domain(id) => id,
            other => other.as_str().to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Finding
// ─────────────────────────────────────────────────────────────────────────────

/// One validator's objection to a design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub code: FindingCode,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// JSON path that triggered the finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Finding {
    pub fn new(code: FindingCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            component: None,
            field: None,
            suggestion: None,
            evidence: None,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn category(&self) -> Category {
        self.code.category()
    }

    pub fn is_domain_pattern(&self) -> bool {
        matches!(self.code, FindingCode::Domain(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────────────────

/// Finding counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeveritySummary {
    fn count(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Output of one validation pass.
///
/// Score, pass flag, summary and verdict are all derived from the findings
/// in [`ValidationReport::from_findings`]; a report is never edited after
/// construction except to append a note to the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// 0..=100.
    pub score: u32,
    pub passed: bool,
    pub summary: SeveritySummary,
    pub verdict: String,
    /// Ordered critical first; stable within a severity.
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    /// Minimum score for a pass.
    pub const PASS_THRESHOLD: u32 = 60;

    /// Score at or above which a passing design is called strong.
    pub const STRONG_THRESHOLD: u32 = 80;

    /// Build a report from the concatenated findings of every validator.
    pub fn from_findings(mut findings: Vec<Finding>) -> Self {
        let mut summary = SeveritySummary::default();
        let mut deducted: u32 = 0;
        for finding in &findings {
            summary.count(finding.severity);
            deducted = deducted.saturating_add(finding.severity.deduction());
        }

        let score = 100u32.saturating_sub(deducted);
        let passed = score >= Self::PASS_THRESHOLD && summary.critical == 0;
        findings.sort_by_key(|f| f.severity);

        let verdict = if passed && score >= Self::STRONG_THRESHOLD {
            format!("PASS: strong design (score {score}/100), ready for review.")
        } else if passed {
            format!(
                "PASS: acceptable design (score {score}/100) with {} high-severity finding(s) to address.",
                summary.high
            )
        } else if summary.critical > 0 {
            format!(
                "FAIL: {} critical issue(s) must be resolved before review (score {score}/100).",
                summary.critical
            )
        } else {
            format!(
                "FAIL: score {score}/100 is below the threshold of {}; address high-severity findings.",
                Self::PASS_THRESHOLD
            )
        };

        Self {
            score,
            passed,
            summary,
            verdict,
            findings,
        }
    }

    pub fn has_critical(&self) -> bool {
        self.summary.critical > 0
    }

    /// Distinct codes of the critical findings.
    pub fn critical_codes(&self) -> BTreeSet<FindingCode> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .map(|f| f.code.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(code: FindingCode, severity: Severity) -> Finding {
        Finding::new(code, severity, "test")
    }

    #[test]
    fn test_empty_report_is_perfect() {
        let report = ValidationReport::from_findings(Vec::new());
        assert_eq!(report.score, 100);
        assert!(report.passed);
        assert!(report.verdict.starts_with("PASS: strong"));
    }

    #[test]
    fn test_single_critical_fails_despite_score() {
        let report = ValidationReport::from_findings(vec![finding(
            FindingCode::SpofDatabase,
            Severity::Critical,
        )]);
        assert_eq!(report.score, 70);
        assert!(!report.passed);
        assert_eq!(report.summary.critical, 1);
        assert!(report.verdict.starts_with("FAIL: 1 critical"));
    }

    #[test]
    fn test_score_floors_at_zero() {
        let findings = (0..5)
            .map(|_| finding(FindingCode::SchemaMissingField, Severity::Critical))
            .collect();
        let report = ValidationReport::from_findings(findings);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn test_below_threshold_without_critical() {
        // 3 high = 45 points
        let findings = (0..3)
            .map(|_| finding(FindingCode::CapNoAutoscaling, Severity::High))
            .collect();
        let report = ValidationReport::from_findings(findings);
        assert_eq!(report.score, 55);
        assert!(!report.passed);
        assert!(report.verdict.contains("below the threshold"));
    }

    #[test]
    fn test_findings_sorted_by_severity_stable() {
        let report = ValidationReport::from_findings(vec![
            Finding::new(FindingCode::MissingSearch, Severity::Low, "a"),
            Finding::new(FindingCode::SpofCache, Severity::High, "b"),
            Finding::new(FindingCode::MissingCaching, Severity::Low, "c"),
            Finding::new(FindingCode::SpofDatabase, Severity::Critical, "d"),
        ]);
        let messages: Vec<_> = report.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_code_wire_format() {
        let json = serde_json::to_string(&FindingCode::AvailCompositeBelowTarget).unwrap();
        assert_eq!(json, "\"AVAIL_COMPOSITE_BELOW_TARGET\"");
        assert_eq!(
            FindingCode::ContraServerlessWithK8s.category(),
            Category::Contradiction
        );
    }

    #[test]
    fn test_domain_codes_keep_their_id() {
        let code = FindingCode::Domain("PAY_IDEMPOTENCY".into());
        assert_eq!(serde_json::to_value(&code).unwrap(), "PAY_IDEMPOTENCY");
        assert_eq!(code.category(), Category::DomainPattern);
        assert_eq!(code.category().as_str(), "domain_pattern");

        let parsed: FindingCode = serde_json::from_str("\"PAY_IDEMPOTENCY\"").unwrap();
        assert_eq!(parsed, code);
        let builtin: FindingCode = serde_json::from_str("\"SPOF_CACHE\"").unwrap();
        assert_eq!(builtin, FindingCode::SpofCache);
    }

    #[test]
    fn test_domain_findings_score_like_any_other() {
        let report = ValidationReport::from_findings(vec![
            Finding::new(FindingCode::Domain("PAY_AUDIT_LOG".into()), Severity::High, "a"),
            Finding::new(FindingCode::SpofCache, Severity::High, "b"),
        ]);
        assert_eq!(report.score, 70);
        assert!(report.findings[0].is_domain_pattern());
        assert!(!report.findings[1].is_domain_pattern());
    }
}
