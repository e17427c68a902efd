//! Errors from loading validation rule files.

/// Result type alias for rule loading.
pub type Result<T> = std::result::Result<T, RulesError>;

/// Errors that can occur while loading domain rule files.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// The rules directory could not be listed.
    #[error("failed to read rules directory '{path}': {source}")]
    ReadDir {
        path: String,
        source: std::io::Error,
    },
}
