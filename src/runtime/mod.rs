//! Public workflow interface (spec.md §6.2) and instance registry. Grounded
//! on `knhk-workflow-engine::executor::engine::WorkflowEngine`'s pattern of
//! a single god-struct holding `DashMap`s of live instances, each driven by
//! a spawned `tokio` task.

pub mod engine;
pub mod state;

pub use engine::{ApprovalHandle, DelegationHandle, EnginePorts, WorkflowEngine};
pub use state::StateStore;
