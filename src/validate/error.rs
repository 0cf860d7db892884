use thiserror::Error;

/// Errors from interpreting an oracle scoring response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No score payload could be recovered from the response at all.
    /// Partially usable responses are repaired instead of rejected.
    #[error("unparseable oracle response: {reason}")]
    Unparseable { reason: String },
}

pub type ValidationResult<T> = Result<T, ValidationError>;
