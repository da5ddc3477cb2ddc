//! Signal payloads consumed by the running workflows (spec.md §3).

use super::cart::{Cart, Money};
use super::ids::{RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub request_id: RequestId,
    pub responsible_id: UserId,
    pub approved: bool,
    pub reason: Option<String>,
    pub modified_cart: Option<Cart>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartModification {
    pub modified_by: UserId,
    pub modified_at: DateTime<Utc>,
    pub changes: serde_json::Value,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DelegationModificationAction {
    Extend,
    ModifyAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyDelegation {
    pub action: DelegationModificationAction,
    pub new_end_at: Option<DateTime<Utc>>,
    pub new_max_amount: Option<Money>,
    pub by: UserId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelDelegation {
    pub by: UserId,
    pub reason: String,
}

/// Envelope sent to approvers when a request enters the wait loop
/// (spec.md §4.3 step 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalEnvelope {
    pub request_id: RequestId,
    pub employee_id: UserId,
    pub cart: Cart,
    pub justification: String,
    pub deadline: DateTime<Utc>,
}
