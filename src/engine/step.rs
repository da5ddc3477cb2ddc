//! Side-effect steps (C2 substrate) — spec.md §4.1 item 2, §7.
//!
//! A step is an engine-mediated side effect: serializable input, recorded
//! outcome, a retry classification, and (where the spec calls for it) an
//! idempotency contract the step implementation itself is responsible for.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Whether a step failure should be retried by the engine's retry loop, or
/// whether it is a terminal business/infrastructure outcome (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Retriable,
    Terminal,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn retriable(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Retriable,
            message: message.into(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Terminal,
            message: message.into(),
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind == ErrorKind::Retriable
    }
}

pub type StepResult<T> = Result<T, StepError>;

/// A named, idempotent, retriable unit of work the engine invokes on behalf
/// of a workflow.
#[async_trait]
pub trait Step: Send + Sync {
    type Input: Serialize + DeserializeOwned + Clone + Send + Sync;
    type Output: Serialize + DeserializeOwned + Send + Sync;

    /// Stable name recorded in history and used for tracing spans.
    fn name(&self) -> &'static str;

    async fn execute(&self, input: Self::Input) -> StepResult<Self::Output>;
}
