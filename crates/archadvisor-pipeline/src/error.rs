//! Error types for the pipeline.

use archadvisor_store::StoreError;
use archadvisor_types::{InputError, RunId, RunStatus};
use thiserror::Error;

use crate::step::Step;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Terminal failure reported by a step handler or context retriever, after
/// its own retry policy is spent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("{step} failed: {message}")]
    Failed { step: Step, message: String },

    /// The handler returned a product the step cannot use.
    #[error("{step} returned unexpected output (expected {expected})")]
    UnexpectedOutput { step: Step, expected: &'static str },
}

impl StepError {
    pub fn failed(step: Step, message: impl Into<String>) -> Self {
        StepError::Failed {
            step,
            message: message.into(),
        }
    }

    pub fn step(&self) -> Step {
        match self {
            StepError::Failed { step, .. } | StepError::UnexpectedOutput { step, .. } => *step,
        }
    }
}

/// Errors surfaced to callers of the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request was rejected; no run was created.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Unknown run id, or the run expired.
    #[error("Run not found: {0}")]
    NotFound(RunId),

    /// The run has not reached a terminal status yet.
    #[error("Run {run_id} is still {status}")]
    NotReady { run_id: RunId, status: RunStatus },

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Step(#[from] StepError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(run_id) => PipelineError::NotFound(run_id),
            other => PipelineError::Store(other),
        }
    }
}
