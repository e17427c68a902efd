//! Input validation errors for run submissions.

use thiserror::Error;

/// Result type alias for input validation.
pub type Result<T> = std::result::Result<T, InputError>;

/// A run request was rejected before a run was created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Requirements text is too short or too long.
    #[error("requirements must be between {min} and {max} characters (got {len})")]
    RequirementsLength { len: usize, min: usize, max: usize },

    /// Debate round bound outside the supported range.
    #[error("max_debate_rounds must be between {min} and {max} (got {value})")]
    DebateRounds { value: u32, min: u32, max: u32 },
}
