//! `DelegationStore` port — the serialization point for delegation records
//! shared across the approval and delegation workflows (spec.md §6.1, §9
//! "Global mutable state"). Writers are serialized by the engine's step
//! machinery; readers see monotonic updates but may observe a stale value,
//! tolerated because `ValidateApproval` re-checks at decision time
//! (spec.md §4.4 "Cross-workflow contract").

use super::catalog::PortError;
use crate::model::{Delegation, DelegationId, DelegationPhase, Money, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter for `list` — all fields are conjunctive and optional.
#[derive(Debug, Clone, Default)]
pub struct DelegationFilter {
    pub from_user_id: Option<UserId>,
    pub active_only: bool,
}

#[async_trait]
pub trait DelegationStore: Send + Sync {
    async fn get(&self, id: &DelegationId) -> Result<Delegation, PortError>;
    async fn list(&self, filter: &DelegationFilter) -> Result<Vec<Delegation>, PortError>;
    async fn put(&self, delegation: Delegation) -> Result<(), PortError>;
    /// Transition the stored delegation to `phase` (spec.md §6.1's
    /// `setActive(id, bool)`, generalized to the phase the workflow has
    /// actually reached rather than a bare flag — `ActivateDelegation`
    /// targets `Active`, `DeactivateDelegation` targets `Expired`,
    /// `Cancelled`, or `Invalid` depending on which path the workflow took).
    async fn set_phase(&self, id: &DelegationId, phase: DelegationPhase, now: DateTime<Utc>) -> Result<(), PortError>;
    async fn set_end_at(&self, id: &DelegationId, new_end_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), PortError>;
    async fn set_max_amount(&self, id: &DelegationId, new_max_amount: Money, now: DateTime<Utc>) -> Result<(), PortError>;
    /// Idempotent on `dedup_key` — a repeated key is a no-op (spec.md §4.2
    /// `RecordDelegationUsage`).
    async fn increment_used(
        &self,
        id: &DelegationId,
        amount: Money,
        dedup_key: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PortError>;
}
