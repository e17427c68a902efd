//! The fixed step topology and its routing functions.
//!
//! ```text
//! retrieve_context → design → validate ─┬─ pass / force ─→ review ─┬─ proceed / force ─→ cost → document → done
//!                                 ↑     │                     ↑    │
//!                                 └─ revise_from_validation ←─┘    └─ revise_from_review
//! ```

use std::fmt;

use archadvisor_types::{Agent, ReviewRecommendation, Route, RunStatus};
use tracing::{info, warn};

/// Revision passes allowed by the validation gate before forcing ahead.
pub const MAX_VALIDATION_ROUNDS: u32 = 2;

/// One node of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    RetrieveContext,
    Design,
    Validate,
    ReviseFromValidation,
    Review,
    ReviseFromReview,
    Cost,
    Document,
}

impl Step {
    /// Run status while this step executes.
    pub fn status(self) -> RunStatus {
        match self {
            Step::RetrieveContext => RunStatus::RetrievingContext,
            Step::Design => RunStatus::Designing,
            Step::Validate => RunStatus::Validating,
            Step::ReviseFromValidation | Step::ReviseFromReview => RunStatus::Revising,
            Step::Review => RunStatus::Reviewing,
            Step::Cost => RunStatus::Costing,
            Step::Document => RunStatus::Documenting,
        }
    }

    pub fn agent(self) -> Agent {
        match self {
            Step::RetrieveContext => Agent::ContextRetriever,
            Step::Design | Step::ReviseFromValidation | Step::ReviseFromReview => Agent::Architect,
            Step::Validate => Agent::Validator,
            Step::Review => Agent::DevilsAdvocate,
            Step::Cost => Agent::CostAnalyzer,
            Step::Document => Agent::Documentation,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::RetrieveContext => "retrieve_context",
            Step::Design => "design",
            Step::Validate => "validate",
            Step::ReviseFromValidation => "revise_from_validation",
            Step::Review => "review",
            Step::ReviseFromReview => "revise_from_review",
            Step::Cost => "cost",
            Step::Document => "document",
        }
    }

    /// Whether this step produces a new design.
    pub fn is_design(self) -> bool {
        matches!(
            self,
            Step::Design | Step::ReviseFromValidation | Step::ReviseFromReview
        )
    }

    /// Progress line published when the step begins.
    pub fn progress_message(self) -> &'static str {
        match self {
            Step::RetrieveContext => "Searching for similar past architectures...",
            Step::Design => "Architect is designing the system architecture...",
            Step::Validate => "Running deterministic validation checks...",
            Step::ReviseFromValidation => "Architect is fixing validation errors...",
            Step::Review => "Devil's Advocate is reviewing the design...",
            Step::ReviseFromReview => "Architect is addressing review findings...",
            Step::Cost => "Cost Analyzer is estimating infrastructure costs...",
            Step::Document => "Documentation agent is producing the final document...",
        }
    }

    /// Successor for steps with a single outgoing edge. `None` for the
    /// gates, whose successor depends on a [`Route`], and for the last step.
    pub fn next(self) -> Option<Step> {
        match self {
            Step::RetrieveContext => Some(Step::Design),
            Step::Design | Step::ReviseFromValidation => Some(Step::Validate),
            Step::ReviseFromReview => Some(Step::Review),
            Step::Cost => Some(Step::Document),
            Step::Validate | Step::Review | Step::Document => None,
        }
    }

    /// Successor of a gate for the given route.
    pub fn after(self, route: Route) -> Option<Step> {
        match (self, route) {
            (Step::Validate, Route::Revise) => Some(Step::ReviseFromValidation),
            (Step::Validate, _) => Some(Step::Review),
            (Step::Review, Route::Revise) => Some(Step::ReviseFromReview),
            (Step::Review, _) => Some(Step::Cost),
            (other, _) => other.next(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation gate: proceed on a pass, revise while rounds remain, otherwise
/// force ahead.
pub fn route_after_validation(passed: bool, validation_round: u32) -> Route {
    if passed {
        info!(round = validation_round, decision = "proceed", "Validation routing");
        Route::Proceed
    } else if validation_round < MAX_VALIDATION_ROUNDS {
        info!(round = validation_round, decision = "revise", "Validation routing");
        Route::Revise
    } else {
        warn!(
            round = validation_round,
            max = MAX_VALIDATION_ROUNDS,
            "Validation rounds exhausted, forcing ahead to review"
        );
        Route::ForceProceed
    }
}

/// Debate gate: the reviewer's recommendation, bounded by `max_rounds`.
pub fn route_after_review(
    recommendation: ReviewRecommendation,
    debate_round: u32,
    max_rounds: u32,
) -> Route {
    if !recommendation.wants_revision() {
        info!(round = debate_round, decision = "proceed", "Debate routing");
        Route::Proceed
    } else if debate_round < max_rounds {
        info!(round = debate_round, decision = "revise", ?recommendation, "Debate routing");
        Route::Revise
    } else {
        warn!(
            round = debate_round,
            max = max_rounds,
            ?recommendation,
            "Debate rounds exhausted, forcing ahead to cost analysis"
        );
        Route::ForceProceed
    }
}
