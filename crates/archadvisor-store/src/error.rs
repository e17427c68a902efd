//! Error types for run store operations.

use archadvisor_types::{RunId, RunStatus};

/// Error type for run store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Unknown run id, or the run outlived its TTL.
    #[error("Run not found: {0}")]
    NotFound(RunId),

    #[error("Run already exists: {0}")]
    AlreadyExists(RunId),

    /// The run finished and no longer accepts changes.
    #[error("Run {run_id} is {status} and cannot be modified")]
    Terminal { run_id: RunId, status: RunStatus },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for run store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
