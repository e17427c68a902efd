//! Shared types for the ArchAdvisor workflow engine.
//!
//! Everything that crosses a crate boundary lives here: the [`Run`] record and
//! its typed [`RunPatch`], validator [`Finding`]s and the [`ValidationReport`]
//! they roll up into, the reviewer's [`Review`], and the [`RunEvent`]s
//! published while a run executes.

pub mod error;
pub mod event;
pub mod output;
pub mod review;
pub mod run;
pub mod validation;

pub use error::{InputError, Result};
pub use event::{Agent, EventKind, Route, RunEvent};
pub use output::{OutputMetadata, RunOutput};
pub use review::{Review, ReviewFinding, ReviewRecommendation};
pub use run::{
    AgentMessage, CloudProvider, DetailLevel, Diagram, ErrorRecord, MAX_DEBATE_ROUNDS,
    MAX_REQUIREMENTS_LEN, MIN_DEBATE_ROUNDS, MIN_REQUIREMENTS_LEN, OutputFormat, Preferences, Run,
    RunId, RunPatch, RunRequest, RunStatus, RunSummary, TOTAL_STEPS,
};
pub use validation::{Category, Finding, FindingCode, Severity, SeveritySummary, ValidationReport};

/// Timestamp type used throughout.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current UTC time.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}
