use thiserror::Error;

/// Errors from the query store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Filesystem or backend access failed.
    #[error("store I/O failure: {reason}")]
    Io { reason: String },

    /// A record could not be encoded or decoded.
    #[error("record serialization failure: {reason}")]
    Serialization { reason: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
