use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SplinkError {
    #[error("malformed query: {primary}; alternate dialect: {secondary}")]
    MalformedQuery { primary: String, secondary: String },

    #[error("repository unreachable: {0}")]
    Connectivity(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Raised by the connection layer when the per-query timeout fires.
    #[error("query interrupted by timeout")]
    QueryInterrupted,

    #[error("Poisoned lock error: {0}")]
    PoisonedLock(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl SplinkError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SplinkError::QueryInterrupted)
    }
}

impl<T> From<std::sync::PoisonError<T>> for SplinkError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        SplinkError::PoisonedLock(err.to_string())
    }
}

impl From<std::io::Error> for SplinkError {
    fn from(err: std::io::Error) -> Self {
        SplinkError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SplinkError {
    fn from(err: serde_json::Error) -> Self {
        SplinkError::InvalidConfig(err.to_string())
    }
}
