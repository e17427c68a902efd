//! The run record, its request, and the typed patch that mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{InputError, Result};
use crate::event::Agent;
use crate::review::Review;
use crate::validation::ValidationReport;
use crate::{Timestamp, now};

/// Shortest accepted requirements text, in characters.
pub const MIN_REQUIREMENTS_LEN: usize = 50;
/// Longest accepted requirements text, in characters.
pub const MAX_REQUIREMENTS_LEN: usize = 10_000;
pub const MIN_DEBATE_ROUNDS: u32 = 1;
pub const MAX_DEBATE_ROUNDS: u32 = 5;
/// Number of user-visible pipeline stages.
pub const TOTAL_STEPS: i32 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Identity and status
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque run identifier, `arch_` followed by 8 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("arch_{}", &hex[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where a run is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Initializing,
    RetrievingContext,
    Designing,
    Validating,
    Reviewing,
    Revising,
    Costing,
    Documenting,
    Complete,
    Error,
    Cancelled,
}

impl RunStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Complete | RunStatus::Error | RunStatus::Cancelled
        )
    }

    /// Progress counter out of [`TOTAL_STEPS`]; `-1` once the run failed or was cancelled.
    pub fn steps_completed(self) -> i32 {
        match self {
            RunStatus::Initializing => 0,
            RunStatus::RetrievingContext => 1,
            RunStatus::Designing => 2,
            RunStatus::Validating | RunStatus::Reviewing | RunStatus::Revising => 3,
            RunStatus::Costing => 4,
            RunStatus::Documenting | RunStatus::Complete => 5,
            RunStatus::Error | RunStatus::Cancelled => -1,
        }
    }

    /// Agent that is working while the run sits in this status.
    pub fn current_agent(self) -> Option<Agent> {
        match self {
            RunStatus::RetrievingContext => Some(Agent::ContextRetriever),
            RunStatus::Designing | RunStatus::Revising => Some(Agent::Architect),
            RunStatus::Validating => Some(Agent::Validator),
            RunStatus::Reviewing => Some(Agent::DevilsAdvocate),
            RunStatus::Costing => Some(Agent::CostAnalyzer),
            RunStatus::Documenting => Some(Agent::Documentation),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Initializing => "initializing",
            RunStatus::RetrievingContext => "retrieving_context",
            RunStatus::Designing => "designing",
            RunStatus::Validating => "validating",
            RunStatus::Reviewing => "reviewing",
            RunStatus::Revising => "revising",
            RunStatus::Costing => "costing",
            RunStatus::Documenting => "documenting",
            RunStatus::Complete => "complete",
            RunStatus::Error => "error",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Brief,
    #[default]
    Detailed,
    Comprehensive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Pdf,
}

/// Per-run knobs supplied with the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub cloud_provider: CloudProvider,
    pub max_debate_rounds: u32,
    pub detail_level: DetailLevel,
    pub output_format: OutputFormat,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            cloud_provider: CloudProvider::default(),
            max_debate_rounds: 3,
            detail_level: DetailLevel::default(),
            output_format: OutputFormat::default(),
        }
    }
}

impl Preferences {
    pub fn with_max_debate_rounds(mut self, rounds: u32) -> Self {
        self.max_debate_rounds = rounds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_DEBATE_ROUNDS..=MAX_DEBATE_ROUNDS).contains(&self.max_debate_rounds) {
            return Err(InputError::DebateRounds {
                value: self.max_debate_rounds,
                min: MIN_DEBATE_ROUNDS,
                max: MAX_DEBATE_ROUNDS,
            });
        }
        Ok(())
    }
}

/// A submission, checked before any run exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub requirements: String,
    #[serde(default)]
    pub preferences: Preferences,
}

impl RunRequest {
    pub fn new(requirements: impl Into<String>) -> Self {
        Self {
            requirements: requirements.into(),
            preferences: Preferences::default(),
        }
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Length is counted in characters after trimming surrounding whitespace.
    pub fn validate(&self) -> Result<()> {
        let len = self.requirements.trim().chars().count();
        if !(MIN_REQUIREMENTS_LEN..=MAX_REQUIREMENTS_LEN).contains(&len) {
            return Err(InputError::RequirementsLength {
                len,
                min: MIN_REQUIREMENTS_LEN,
                max: MAX_REQUIREMENTS_LEN,
            });
        }
        self.preferences.validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run record
// ─────────────────────────────────────────────────────────────────────────────

/// One entry in a run's append-only step log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent: Agent,
    pub summary: String,
    pub duration_seconds: f64,
    pub cost_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: Timestamp,
}

impl AgentMessage {
    pub fn new(agent: Agent, summary: impl Into<String>) -> Self {
        Self {
            agent,
            summary: summary.into(),
            duration_seconds: 0.0,
            cost_usd: 0.0,
            model: None,
            timestamp: now(),
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_cost(mut self, usd: f64) -> Self {
        self.cost_usd = usd;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A recorded failure. Written before the run moves to `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub step: String,
    pub message: String,
    pub timestamp: Timestamp,
}

impl ErrorRecord {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
            timestamp: now(),
        }
    }
}

/// A Mermaid diagram attached to the final document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub mermaid_code: String,
}

/// Full state of one pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub requirements: String,
    pub preferences: Preferences,
    pub status: RunStatus,
    #[serde(default)]
    pub current_design: Option<Value>,
    #[serde(default)]
    pub similar_architectures: Vec<String>,
    #[serde(default)]
    pub validation_report: Option<ValidationReport>,
    #[serde(default)]
    pub review: Option<Review>,
    #[serde(default)]
    pub cost_analysis: Option<Value>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub diagrams: Vec<Diagram>,
    pub validation_round: u32,
    pub debate_round: u32,
    /// Set when validation never passed and the pipeline moved on anyway.
    pub validation_incomplete: bool,
    /// Set when the reviewer still wanted changes after the last debate round.
    pub debate_unresolved: bool,
    pub messages: Vec<AgentMessage>,
    pub errors: Vec<ErrorRecord>,
    pub total_cost_usd: f64,
    #[serde(default)]
    pub submitted_by: Option<String>,
    pub started_at: Timestamp,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl Run {
    /// A fresh run in `initializing`. The request is assumed validated.
    pub fn new(id: RunId, request: RunRequest) -> Self {
        Self {
            id,
            requirements: request.requirements,
            preferences: request.preferences,
            status: RunStatus::Initializing,
            current_design: None,
            similar_architectures: Vec::new(),
            validation_report: None,
            review: None,
            cost_analysis: None,
            document: None,
            diagrams: Vec::new(),
            validation_round: 0,
            debate_round: 0,
            validation_incomplete: false,
            debate_unresolved: false,
            messages: Vec::new(),
            errors: Vec::new(),
            total_cost_usd: 0.0,
            submitted_by: None,
            started_at: now(),
            completed_at: None,
        }
    }

    pub fn with_submitter(mut self, submitter: impl Into<String>) -> Self {
        self.submitted_by = Some(submitter.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock seconds from start to completion, or to now if still running.
    pub fn duration_seconds(&self) -> f64 {
        let end = self.completed_at.unwrap_or_else(now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Distinct model names seen in the step log, in first-use order.
    pub fn models_used(&self) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        for model in self.messages.iter().filter_map(|m| m.model.as_ref()) {
            if !models.contains(model) {
                models.push(model.clone());
            }
        }
        models
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.id.clone(),
            status: self.status,
            requirements_preview: preview(&self.requirements, RunSummary::PREVIEW_CHARS),
            total_cost_usd: self.total_cost_usd,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Listing entry for recent runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub status: RunStatus,
    pub requirements_preview: String,
    pub total_cost_usd: f64,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl RunSummary {
    pub const PREVIEW_CHARS: usize = 100;
}

// ─────────────────────────────────────────────────────────────────────────────
// Patch
// ─────────────────────────────────────────────────────────────────────────────

/// A set of field changes applied to a run in one atomic step.
///
/// `None` leaves a field untouched. `messages` and `errors` are appended,
/// and `cost_delta` is added to the running total, so two patches built
/// from the same snapshot never clobber each other's log entries or cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPatch {
    pub status: Option<RunStatus>,
    pub current_design: Option<Value>,
    pub similar_architectures: Option<Vec<String>>,
    pub validation_report: Option<ValidationReport>,
    pub review: Option<Review>,
    pub cost_analysis: Option<Value>,
    pub document: Option<String>,
    pub diagrams: Option<Vec<Diagram>>,
    pub validation_round: Option<u32>,
    pub debate_round: Option<u32>,
    pub validation_incomplete: Option<bool>,
    pub debate_unresolved: Option<bool>,
    pub messages: Vec<AgentMessage>,
    pub errors: Vec<ErrorRecord>,
    pub cost_delta: f64,
    pub completed_at: Option<Timestamp>,
}

impl RunPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_design(mut self, design: Value) -> Self {
        self.current_design = Some(design);
        self
    }

    pub fn with_similar_architectures(mut self, similar: Vec<String>) -> Self {
        self.similar_architectures = Some(similar);
        self
    }

    pub fn with_validation_report(mut self, report: ValidationReport) -> Self {
        self.validation_report = Some(report);
        self
    }

    pub fn with_review(mut self, review: Review) -> Self {
        self.review = Some(review);
        self
    }

    pub fn with_cost_analysis(mut self, analysis: Value) -> Self {
        self.cost_analysis = Some(analysis);
        self
    }

    pub fn with_document(mut self, markdown: impl Into<String>, diagrams: Vec<Diagram>) -> Self {
        self.document = Some(markdown.into());
        self.diagrams = Some(diagrams);
        self
    }

    pub fn with_validation_round(mut self, round: u32) -> Self {
        self.validation_round = Some(round);
        self
    }

    pub fn with_debate_round(mut self, round: u32) -> Self {
        self.debate_round = Some(round);
        self
    }

    pub fn with_validation_incomplete(mut self, flag: bool) -> Self {
        self.validation_incomplete = Some(flag);
        self
    }

    pub fn with_debate_unresolved(mut self, flag: bool) -> Self {
        self.debate_unresolved = Some(flag);
        self
    }

    pub fn with_message(mut self, message: AgentMessage) -> Self {
        self.cost_delta += message.cost_usd;
        self.messages.push(message);
        self
    }

    pub fn with_error(mut self, error: ErrorRecord) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_completed_at(mut self, at: Timestamp) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// True when applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, run: &mut Run) {
        if let Some(status) = self.status {
            run.status = status;
        }
        if let Some(design) = self.current_design {
            run.current_design = Some(design);
        }
        if let Some(similar) = self.similar_architectures {
            run.similar_architectures = similar;
        }
        if let Some(report) = self.validation_report {
            run.validation_report = Some(report);
        }
        if let Some(review) = self.review {
            run.review = Some(review);
        }
        if let Some(analysis) = self.cost_analysis {
            run.cost_analysis = Some(analysis);
        }
        if let Some(document) = self.document {
            run.document = Some(document);
        }
        if let Some(diagrams) = self.diagrams {
            run.diagrams = diagrams;
        }
        if let Some(round) = self.validation_round {
            run.validation_round = round;
        }
        if let Some(round) = self.debate_round {
            run.debate_round = round;
        }
        if let Some(flag) = self.validation_incomplete {
            run.validation_incomplete = flag;
        }
        if let Some(flag) = self.debate_unresolved {
            run.debate_unresolved = flag;
        }
        run.messages.extend(self.messages);
        run.errors.extend(self.errors);
        run.total_cost_usd += self.cost_delta;
        if let Some(at) = self.completed_at {
            run.completed_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirements() -> String {
        "Build a notification platform that fans out alerts to email, SMS and push.".to_string()
    }

    #[test]
    fn test_run_id_format() {
        let id = RunId::generate();
        let s = id.as_str();
        assert!(s.starts_with("arch_"));
        assert_eq!(s.len(), 13);
        assert!(s[5..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_request_length_bounds() {
        assert!(RunRequest::new(requirements()).validate().is_ok());

        let err = RunRequest::new("too short").validate().unwrap_err();
        assert!(matches!(err, InputError::RequirementsLength { len: 9, .. }));

        let long = "x".repeat(MAX_REQUIREMENTS_LEN + 1);
        assert!(RunRequest::new(long).validate().is_err());
    }

    #[test]
    fn test_request_debate_bounds() {
        for rounds in [0, 6] {
            let req = RunRequest::new(requirements())
                .with_preferences(Preferences::default().with_max_debate_rounds(rounds));
            assert!(matches!(
                req.validate(),
                Err(InputError::DebateRounds { .. })
            ));
        }
    }

    #[test]
    fn test_preferences_defaults_from_partial_json() {
        let prefs: Preferences = serde_json::from_str(r#"{"cloud_provider":"aws"}"#).unwrap();
        assert_eq!(prefs.cloud_provider, CloudProvider::Aws);
        assert_eq!(prefs.max_debate_rounds, 3);
        assert_eq!(prefs.detail_level, DetailLevel::Detailed);
    }

    #[test]
    fn test_patch_appends_and_accumulates() {
        let mut run = Run::new(RunId::from("arch_00000001"), RunRequest::new(requirements()));

        RunPatch::new()
            .with_status(RunStatus::Designing)
            .with_message(AgentMessage::new(Agent::Architect, "designed").with_cost(0.05))
            .apply(&mut run);
        RunPatch::new()
            .with_message(AgentMessage::new(Agent::Validator, "validated"))
            .with_validation_round(1)
            .apply(&mut run);

        assert_eq!(run.status, RunStatus::Designing);
        assert_eq!(run.messages.len(), 2);
        assert_eq!(run.validation_round, 1);
        assert!((run.total_cost_usd - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_empty_patch() {
        assert!(RunPatch::new().is_empty());
        assert!(!RunPatch::new().with_debate_round(1).is_empty());
    }

    #[test]
    fn test_progress_counters() {
        assert_eq!(RunStatus::Initializing.steps_completed(), 0);
        assert_eq!(RunStatus::Revising.steps_completed(), 3);
        assert_eq!(RunStatus::Complete.steps_completed(), TOTAL_STEPS);
        assert_eq!(RunStatus::Cancelled.steps_completed(), -1);
        assert_eq!(RunStatus::Reviewing.current_agent(), Some(Agent::DevilsAdvocate));
        assert!(RunStatus::Error.is_terminal());
        assert!(!RunStatus::Documenting.is_terminal());
    }

    #[test]
    fn test_summary_preview_truncates() {
        let long = "a".repeat(300);
        let run = Run::new(RunId::generate(), RunRequest::new(long));
        let summary = run.summary();
        assert_eq!(summary.requirements_preview.chars().count(), 103);
    }
}
