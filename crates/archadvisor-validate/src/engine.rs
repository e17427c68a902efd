//! Runs every validator over a design and scores the result.

use std::time::Instant;

use archadvisor_types::{Finding, FindingCode, Severity, ValidationReport};
use serde_json::Value;
use tracing::{debug, info};

use crate::design::Design;
use crate::domain::{DomainCatalog, DomainPatternValidator};
use crate::reference::ReferenceData;
use crate::rules::{
    AvailabilityValidator, CapacityValidator, ComplexityValidator, ConsistencyValidator,
    ContradictionValidator, CoverageValidator, SchemaValidator,
};
use crate::validator::Validator;

/// The validation gate placed in front of the review step.
///
/// Validators are independent, so order affects only the order of findings
/// before the report sorts them by severity.
pub struct ValidationEngine {
    validators: Vec<Box<dyn Validator>>,
    reference: ReferenceData,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// Engine with the seven built-in validators.
    pub fn new() -> Self {
        Self::with_validators(vec![
            Box::new(SchemaValidator),
            Box::new(AvailabilityValidator),
            Box::new(CapacityValidator),
            Box::new(ConsistencyValidator),
            Box::new(ContradictionValidator),
            Box::new(ComplexityValidator),
            Box::new(CoverageValidator),
        ])
    }

    pub fn with_validators(validators: Vec<Box<dyn Validator>>) -> Self {
        Self {
            validators,
            reference: ReferenceData::builtin(),
        }
    }

    pub fn with_reference(mut self, reference: ReferenceData) -> Self {
        self.reference = reference;
        self
    }

    /// Add domain rule checks to the chain. An empty catalog adds nothing.
    pub fn with_domain_rules(mut self, catalog: DomainCatalog) -> Self {
        if !catalog.is_empty() {
            self.push(Box::new(DomainPatternValidator::new(catalog)));
        }
        self
    }

    /// Append a validator to the chain.
    pub fn push(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    pub fn validator_names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Validate a design and score it.
    pub fn run_all(&self, design: &Value, requirements: &str) -> ValidationReport {
        let started = Instant::now();
        let view = Design::new(design);

        let mut findings = Vec::new();
        for validator in &self.validators {
            let t = Instant::now();
            let found = validator.check(&view, requirements, &self.reference);
            debug!(
                validator = validator.name(),
                findings = found.len(),
                duration_us = t.elapsed().as_micros() as u64,
                "Validator finished"
            );
            findings.extend(found);
        }

        let report = ValidationReport::from_findings(findings);
        info!(
            score = report.score,
            passed = report.passed,
            critical = report.summary.critical,
            high = report.summary.high,
            medium = report.summary.medium,
            low = report.summary.low,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Validation complete"
        );
        report
    }

    /// Validate raw design text. Text that isn't JSON fails with a single
    /// critical finding.
    pub fn run_all_str(&self, design: &str, requirements: &str) -> ValidationReport {
        match serde_json::from_str::<Value>(design) {
            Ok(value) => self.run_all(&value, requirements),
            Err(e) => {
                info!(error = %e, "Design is not valid JSON");
                ValidationReport::from_findings(vec![
                    Finding::new(
                        FindingCode::SchemaInvalidType,
                        Severity::Critical,
                        format!("Cannot parse architecture JSON: {e}"),
                    )
                    .with_suggestion("Make sure the design output is valid JSON"),
                ])
            }
        }
    }

    /// Like [`run_all`](Self::run_all), noting critical codes that survived
    /// a revision.
    pub fn run_with_previous(
        &self,
        design: &Value,
        requirements: &str,
        previous: Option<&ValidationReport>,
    ) -> ValidationReport {
        let mut report = self.run_all(design, requirements);
        let Some(previous) = previous else {
            return report;
        };

        let before = previous.critical_codes();
        let current = report.critical_codes();
        let recurring: Vec<&str> = current
            .intersection(&before)
            .map(|c| c.as_str())
            .collect();
        if !recurring.is_empty() {
            report.verdict.push_str(&format!(
                " WARNING: {} critical issue(s) persist from the previous revision: {}",
                recurring.len(),
                recurring.join(", ")
            ));
        }
        report
    }
}
