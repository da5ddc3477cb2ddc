//! `Delegation` — temporary transfer of approval authority (spec.md §3).

use super::cart::Money;
use super::ids::{DelegationId, UserId};
use crate::error::{WorkflowError, WorkflowResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of a delegation workflow instance (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationPhase {
    Validating,
    Scheduled,
    Active,
    Expired,
    Cancelled,
    Invalid,
}

impl DelegationPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DelegationPhase::Expired | DelegationPhase::Cancelled | DelegationPhase::Invalid
        )
    }
}

/// A delegation of approval authority from `from_user_id` to `to_user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    pub id: DelegationId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub max_amount: Money,
    pub reason: String,
    pub phase: DelegationPhase,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Sum of amounts approved through this delegation so far.
    pub used_amount: Money,
    /// Dedup keys of `(requestId, approverId)` already recorded, so
    /// `RecordDelegationUsage` retries are no-ops (spec.md §4.2).
    pub usage_keys_seen: Vec<String>,
}

impl Delegation {
    pub fn new(
        from_user_id: UserId,
        to_user_id: UserId,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        max_amount: Money,
        reason: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DelegationId::new(),
            from_user_id,
            to_user_id,
            start_at,
            end_at,
            max_amount,
            reason,
            phase: DelegationPhase::Validating,
            created_at: now,
            modified_at: now,
            used_amount: 0,
            usage_keys_seen: Vec::new(),
        }
    }

    /// Structural invariants from spec.md §3 (everything except the
    /// `approvalLimit` cross-check, which `ValidateDelegation` performs via
    /// `UserDirectory`).
    pub fn validate_structure(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.end_at <= self.start_at {
            errors.push("endAt must be after startAt".to_string());
        }
        if self.from_user_id == self.to_user_id {
            errors.push("fromUserId and toUserId must differ".to_string());
        }
        if self.max_amount <= 0 {
            errors.push("maxAmount must be positive".to_string());
        }
        errors
    }

    /// `active` is true only while `now ∈ [startAt, endAt)` and the
    /// workflow hasn't reached a terminal phase.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.phase == DelegationPhase::Active && self.start_at <= now && now < self.end_at
    }

    pub fn headroom(&self, cap: f64) -> Money {
        let capped_max = (self.max_amount as f64 * cap) as Money;
        (capped_max - self.used_amount).max(0)
    }

    /// Idempotent on `(requestId, approverId)` — the second call with the
    /// same key is a no-op, per spec.md §4.2 `RecordDelegationUsage`.
    pub fn record_usage(&mut self, dedup_key: &str, amount: Money, now: DateTime<Utc>) {
        if self.usage_keys_seen.iter().any(|k| k == dedup_key) {
            return;
        }
        self.used_amount += amount;
        self.usage_keys_seen.push(dedup_key.to_string());
        self.modified_at = now;
    }

    fn transition(&mut self, to: DelegationPhase, now: DateTime<Utc>) -> WorkflowResult<()> {
        if self.phase.is_terminal() {
            return Err(WorkflowError::InvalidStateTransition {
                from: format!("{:?}", self.phase),
                to: format!("{:?}", to),
            });
        }
        self.phase = to;
        self.modified_at = now;
        Ok(())
    }

    pub fn schedule(&mut self, now: DateTime<Utc>) -> WorkflowResult<()> {
        self.transition(DelegationPhase::Scheduled, now)
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> WorkflowResult<()> {
        self.transition(DelegationPhase::Active, now)
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> WorkflowResult<()> {
        self.transition(DelegationPhase::Expired, now)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> WorkflowResult<()> {
        self.transition(DelegationPhase::Cancelled, now)
    }

    pub fn invalidate(&mut self, now: DateTime<Utc>) -> WorkflowResult<()> {
        self.transition(DelegationPhase::Invalid, now)
    }

    pub fn extend(&mut self, new_end_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.end_at = new_end_at;
        self.modified_at = now;
    }

    pub fn set_max_amount(&mut self, new_max_amount: Money, now: DateTime<Utc>) {
        self.max_amount = new_max_amount;
        self.modified_at = now;
    }
}
