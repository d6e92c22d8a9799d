// Error types for configuration and output.
//
// Search failure is not an error: an attempt that finds nothing simply
// yields zero solutions and the orchestrator redraws. Errors are reserved for
// requests that can never succeed (bad configuration), for a run whose every
// attempt came back empty, and for the I/O of the output collaborators.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no {variant} solution found after {attempts} attempts")]
    NoSolution {
        variant: &'static str,
        attempts: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
