//! Durable workflow engine for employee purchase approvals and
//! approval-authority delegation: deterministic replay, retried side-effect
//! steps, signals, timers, and a selector primitive, in the style of
//! `knhk-workflow-engine`'s case-execution core.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod ports;
pub mod runtime;
pub mod steps;
pub mod workflows;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{EngineConfig, RetryPolicy};
pub use error::{WorkflowError, WorkflowResult};
pub use runtime::{EnginePorts, StateStore, WorkflowEngine};
