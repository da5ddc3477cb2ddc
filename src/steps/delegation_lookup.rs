//! `FindActiveDelegation` and `ValidateApproval` (spec.md §4.2) — read-only
//! steps consulted during approver resolution and at decision time.

use crate::engine::step::{Step, StepError, StepResult};
use crate::model::{Money, UserId};
use crate::ports::{DelegationFilter, DelegationStore, PortError, UserDirectory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindActiveDelegationInput {
    pub from_user_id: UserId,
    pub amount: Money,
    pub now: DateTime<Utc>,
}

/// Finds the delegatee of the best-matching active delegation for
/// `from_user_id`, if any (spec.md §4.2). Idempotent read.
pub struct FindActiveDelegation {
    store: Arc<dyn DelegationStore>,
    usage_cap: f64,
}

impl FindActiveDelegation {
    pub fn new(store: Arc<dyn DelegationStore>, usage_cap: f64) -> Self {
        Self { store, usage_cap }
    }
}

#[async_trait]
impl Step for FindActiveDelegation {
    type Input = FindActiveDelegationInput;
    type Output = Option<UserId>;

    fn name(&self) -> &'static str {
        "FindActiveDelegation"
    }

    async fn execute(&self, input: FindActiveDelegationInput) -> StepResult<Option<UserId>> {
        let candidates = self
            .store
            .list(&DelegationFilter {
                from_user_id: Some(input.from_user_id),
                active_only: true,
            })
            .await
            .map_err(to_step_error)?;

        let best = candidates
            .into_iter()
            .filter(|d| d.is_active_at(input.now) && input.amount <= d.headroom(self.usage_cap))
            .min_by(|a, b| {
                a.start_at
                    .cmp(&b.start_at)
                    .then(a.created_at.cmp(&b.created_at))
            });

        Ok(best.map(|d| d.to_user_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateApprovalInput {
    pub approver_id: UserId,
    pub amount: Money,
    pub now: DateTime<Utc>,
}

/// Returns true iff `approver_id` either has an intrinsic limit covering
/// `amount` or holds an active delegation with sufficient headroom
/// (spec.md §4.2). Read-only.
pub struct ValidateApproval {
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn DelegationStore>,
    usage_cap: f64,
}

impl ValidateApproval {
    pub fn new(users: Arc<dyn UserDirectory>, store: Arc<dyn DelegationStore>, usage_cap: f64) -> Self {
        Self { users, store, usage_cap }
    }
}

#[async_trait]
impl Step for ValidateApproval {
    type Input = ValidateApprovalInput;
    type Output = bool;

    fn name(&self) -> &'static str {
        "ValidateApproval"
    }

    async fn execute(&self, input: ValidateApprovalInput) -> StepResult<bool> {
        let profile = self.users.get_user(&input.approver_id).await.map_err(to_step_error)?;
        if profile.approval_limit >= input.amount {
            return Ok(true);
        }

        let delegations = self
            .store
            .list(&DelegationFilter::default())
            .await
            .map_err(to_step_error)?;

        let has_headroom = delegations.into_iter().any(|d| {
            d.to_user_id == input.approver_id
                && d.is_active_at(input.now)
                && input.amount <= d.headroom(self.usage_cap)
        });
        Ok(has_headroom)
    }
}

fn to_step_error(err: PortError) -> StepError {
    match err {
        PortError::Transient(msg) => StepError::retriable(msg),
        PortError::NotFound(msg) => StepError::terminal(msg),
        PortError::Terminal(msg) => StepError::terminal(msg),
    }
}
