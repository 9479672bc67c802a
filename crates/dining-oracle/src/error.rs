//! Error types for oracle operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Subject binary unavailable: {path}: {source}")]
    SubjectUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Race detector unavailable: {tool}")]
    ToolUnavailable { tool: String },

    #[error("Invalid run request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OracleError {
    /// Whether this error must abort the whole suite rather than a single
    /// scenario. Infrastructure problems (missing subject, missing detector)
    /// are suite-fatal; everything else is scenario-local data.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OracleError::SubjectUnavailable { .. } | OracleError::ToolUnavailable { .. }
        )
    }
}

/// Result type for oracle operations
pub type Result<T> = std::result::Result<T, OracleError>;
