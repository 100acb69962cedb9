//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error taxonomy.
///
/// Only `Model` and `IterationLimit` may abort a run, and only `Config` may
/// abort startup. `Persistence` is consumed inside the checkpointer and
/// never reaches a caller of the graph.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model provider failure (connection, timeout, malformed response)
    #[error("Model error: {0}")]
    Model(String),

    /// Persistence backend failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid construction-time configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Maximum agent/tools cycles reached without a terminal answer
    #[error("Maximum iterations ({0}) reached")]
    IterationLimit(usize),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Convert to a user-facing message that leaks no internals
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(_) => {
                "The AI service encountered an error. Please try again.".into()
            }
            AgentError::IterationLimit(_) => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            AgentError::Config(msg) => format!("Configuration error: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}
