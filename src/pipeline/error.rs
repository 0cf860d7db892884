use thiserror::Error;

/// Terminal errors of the highlight pipeline.
///
/// `Clone` because one computation's failure fans out to every caller
/// coalesced onto it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HighlightError {
    /// A required request field was empty after trimming.
    #[error("{field} must not be empty")]
    EmptyInput { field: &'static str },

    /// No usable API key, or the oracle rejected the one presented.
    #[error("invalid oracle credentials: {reason}")]
    InvalidCredentials { reason: String },

    /// The oracle refused the request for a non-credential reason.
    #[error("oracle rejected the request: {reason}")]
    OracleRejected { reason: String },

    /// The oracle stayed unreachable through every retry attempt.
    #[error("oracle unavailable after {attempts} attempts: {reason}")]
    OracleUnavailable { attempts: u32, reason: String },

    /// No usable scores could be recovered, even from a fresh attempt.
    #[error("oracle response failed validation: {reason}")]
    Validation { reason: String },

    /// The computation task died before publishing a result.
    #[error("highlight computation aborted")]
    FlightAborted,
}
