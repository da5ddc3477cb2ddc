//! Workflow orchestration: C3 Approval Workflow and C4 Delegation Workflow.

pub mod approval;
pub mod delegation;

pub use approval::{run_approval_workflow, ApprovalDeps, RequestStatusHandle};
pub use delegation::{get_delegation_status, run_delegation_workflow, DelegationDeps, DelegationOutcome, DelegationStatus};
