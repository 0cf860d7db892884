use thiserror::Error;

/// Errors from the relevance oracle boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// No API key was available from the request or the process.
    #[error("no oracle credentials available")]
    MissingCredentials,

    /// The oracle rejected the presented credentials.
    #[error("oracle rejected credentials: {reason}")]
    InvalidCredentials { reason: String },

    /// The oracle understood the request and refused it. Not retryable.
    #[error("oracle rejected request: {reason}")]
    Rejected { reason: String },

    /// The oracle could not be reached or answered abnormally. Retryable.
    #[error("oracle unavailable: {reason}")]
    Unavailable { reason: String },
}
