use thiserror::Error;

/// Domain failures that callers need to tell apart.
///
/// Everything else (SQLite, I/O, CSV) travels as a plain `anyhow::Error`;
/// these two ride inside it and are recovered with `downcast_ref`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AnalysisError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Find a domain error anywhere in an `anyhow` chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Option<&AnalysisError> {
        err.chain().find_map(|e| e.downcast_ref::<AnalysisError>())
    }
}
