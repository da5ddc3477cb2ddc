//! Approval flow state embedded in a `PurchaseRequest` (spec.md §3).

use super::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An append-only record of a cart edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modification {
    pub modified_by: UserId,
    pub modified_at: DateTime<Utc>,
    pub reason: String,
    /// Opaque encoded change description (the spec leaves the encoding
    /// unspecified; callers pass whatever description they want audited).
    pub change: serde_json::Value,
}

/// Approval chain and decision state for one `PurchaseRequest`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApprovalFlow {
    /// Ordered sequence of approver ids, set once after `ResolveApprovers`.
    pub required_approvers: Vec<UserId>,
    /// Subset of `required_approvers` who have approved so far.
    pub approved_by: Vec<UserId>,
    pub rejected_by: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// Append-only log of cart edits.
    pub modifications: Vec<Modification>,
}

impl ApprovalFlow {
    /// Invariant (a): `approvedBy ⊆ requiredApprovers`.
    pub fn approved_by_is_subset(&self) -> bool {
        self.approved_by
            .iter()
            .all(|u| self.required_approvers.contains(u))
    }

    pub fn has_approved(&self, user: &UserId) -> bool {
        self.approved_by.contains(user)
    }

    pub fn record_approval(&mut self, user: UserId) {
        if !self.has_approved(&user) {
            self.approved_by.push(user);
        }
    }

    pub fn is_fully_approved(&self) -> bool {
        !self.required_approvers.is_empty() && self.approved_by.len() >= self.required_approvers.len()
    }

    pub fn push_modification(&mut self, modification: Modification) {
        self.modifications.push(modification);
    }
}
