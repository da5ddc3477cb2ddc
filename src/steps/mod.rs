//! Side-effect steps (C2) — spec.md §4.2. Each step is a `Step`
//! implementation over an injected port, invoked only through
//! `Ctx::call_step` so its outcome is recorded and replayed.

pub mod catalog_validation;
pub mod delegation_admin;
pub mod delegation_lookup;
pub mod notify;
pub mod purchase;
pub mod resolve_approvers;

pub use catalog_validation::ValidateCatalogEntries;
pub use delegation_admin::{
    ActivateDelegation, DeactivateDelegation, DeactivateDelegationInput, DelegationIdAt,
    ExtendDelegation, ExtendDelegationInput, ModifyDelegationAmount, ModifyDelegationAmountInput,
    RecordDelegationUsage, RecordDelegationUsageInput, ValidateDelegation, ValidationOutcome,
};
pub use delegation_lookup::{FindActiveDelegation, FindActiveDelegationInput, ValidateApproval, ValidateApprovalInput};
pub use notify::{AuditDecision, AuditDecisionInput, NotifyRecipient, NotifyRecipientInput};
pub use purchase::{ExecutePurchase, ExecutePurchaseInput};
pub use resolve_approvers::{ResolveApprovers, ResolveApproversInput};
