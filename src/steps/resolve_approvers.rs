//! `ResolveApprovers` (spec.md §4.2) — computes the ordered approver chain
//! for a request, substituting active delegations and detecting
//! self-approval.

use crate::engine::step::{Step, StepError, StepResult};
use crate::model::{Money, UserId};
use crate::ports::{DelegationFilter, DelegationStore, PortError, UserDirectory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveApproversInput {
    pub employee_id: UserId,
    pub amount: Money,
    pub now: DateTime<Utc>,
}

pub struct ResolveApprovers {
    users: Arc<dyn UserDirectory>,
    delegations: Arc<dyn DelegationStore>,
    threshold_high: Money,
    threshold_mid: Money,
    mid_tier_inclusive_bound: bool,
    usage_cap: f64,
    ceo_user_id: UserId,
}

impl ResolveApprovers {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        delegations: Arc<dyn DelegationStore>,
        threshold_high: Money,
        threshold_mid: Money,
        mid_tier_inclusive_bound: bool,
        usage_cap: f64,
        ceo_user_id: UserId,
    ) -> Self {
        Self {
            users,
            delegations,
            threshold_high,
            threshold_mid,
            mid_tier_inclusive_bound,
            usage_cap,
            ceo_user_id,
        }
    }

    fn is_mid_tier(&self, amount: Money) -> bool {
        if self.mid_tier_inclusive_bound {
            amount >= self.threshold_mid
        } else {
            amount > self.threshold_mid
        }
    }

    async fn substitute_delegate(&self, direct: &UserId, amount: Money, now: DateTime<Utc>) -> StepResult<UserId> {
        let candidates = self
            .delegations
            .list(&DelegationFilter {
                from_user_id: Some(direct.clone()),
                active_only: true,
            })
            .await
            .map_err(to_step_error)?;

        let best = candidates
            .into_iter()
            .filter(|d| d.is_active_at(now) && amount <= d.headroom(self.usage_cap))
            .min_by(|a, b| a.start_at.cmp(&b.start_at).then(a.created_at.cmp(&b.created_at)));

        Ok(best.map(|d| d.to_user_id).unwrap_or_else(|| direct.clone()))
    }
}

#[async_trait]
impl Step for ResolveApprovers {
    type Input = ResolveApproversInput;
    type Output = Vec<UserId>;

    fn name(&self) -> &'static str {
        "ResolveApprovers"
    }

    async fn execute(&self, input: ResolveApproversInput) -> StepResult<Vec<UserId>> {
        let profile = self
            .users
            .get_user(&input.employee_id)
            .await
            .map_err(to_step_error)?;

        if profile.approval_limit >= input.amount {
            return Ok(Vec::new());
        }

        let direct_chain: Vec<UserId> = if input.amount > self.threshold_high {
            vec![self.ceo_user_id.clone()]
        } else if self.is_mid_tier(input.amount) {
            let mut chain = Vec::new();
            if let Some(manager) = &profile.manager_id {
                chain.push(manager.clone());
            }
            if let Some(supervisor) = &profile.supervisor_id {
                chain.push(supervisor.clone());
            }
            if chain.is_empty() {
                return Err(StepError::terminal(format!(
                    "no manager or supervisor configured for {}",
                    input.employee_id
                )));
            }
            chain
        } else {
            let supervisor = profile.supervisor_id.clone().ok_or_else(|| {
                StepError::terminal(format!("no supervisor configured for {}", input.employee_id))
            })?;
            vec![supervisor]
        };

        let mut resolved = Vec::with_capacity(direct_chain.len());
        for direct in &direct_chain {
            resolved.push(self.substitute_delegate(direct, input.amount, input.now).await?);
        }

        let mut deduped = Vec::with_capacity(resolved.len());
        for id in resolved {
            if !deduped.contains(&id) {
                deduped.push(id);
            }
        }
        Ok(deduped)
    }
}

fn to_step_error(err: PortError) -> StepError {
    match err {
        PortError::Transient(msg) => StepError::retriable(msg),
        PortError::NotFound(msg) => StepError::terminal(msg),
        PortError::Terminal(msg) => StepError::terminal(msg),
    }
}
