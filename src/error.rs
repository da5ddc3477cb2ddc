//! Crate-wide error type.

use thiserror::Error;

/// Result type for workflow and step operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors surfaced by the engine, the workflows, and the steps.
#[derive(Error, Debug, Clone)]
pub enum WorkflowError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("step {step} failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("state persistence error: {0}")]
    StatePersistence(String),

    #[error("operation timed out")]
    Timeout,

    #[error("workflow was cancelled: {0}")]
    Cancelled(String),

    #[error("non-deterministic workflow replay: {0}")]
    NonDeterminism(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Parse(format!("serialization error: {err}"))
    }
}

impl From<sled::Error> for WorkflowError {
    fn from(err: sled::Error) -> Self {
        WorkflowError::StatePersistence(err.to_string())
    }
}
