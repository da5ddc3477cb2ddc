//! Delegation administration steps (spec.md §4.2): validation and the four
//! state-transition steps the delegation workflow drives, plus usage
//! recording consulted by the approval workflow.

use crate::engine::step::{Step, StepError, StepResult};
use crate::model::{Delegation, DelegationId, DelegationPhase, Money, RequestId, UserId};
use crate::ports::{DelegationFilter, DelegationStore, PortError, UserDirectory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn to_step_error(err: PortError) -> StepError {
    match err {
        PortError::Transient(msg) => StepError::retriable(msg),
        PortError::NotFound(msg) => StepError::terminal(msg),
        PortError::Terminal(msg) => StepError::terminal(msg),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub errors: Vec<String>,
}

/// `ValidateDelegation` — structural invariants plus the approval-limit
/// cross-check against `UserDirectory` (spec.md §3, §4.2).
pub struct ValidateDelegation {
    users: Arc<dyn UserDirectory>,
}

impl ValidateDelegation {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Step for ValidateDelegation {
    type Input = Delegation;
    type Output = ValidationOutcome;

    fn name(&self) -> &'static str {
        "ValidateDelegation"
    }

    async fn execute(&self, delegation: Delegation) -> StepResult<ValidationOutcome> {
        let mut errors = delegation.validate_structure();

        match self.users.get_user(&delegation.from_user_id).await {
            Ok(profile) if delegation.max_amount > profile.approval_limit => {
                errors.push("maxAmount exceeds fromUserId's approval limit".to_string());
            }
            Ok(_) => {}
            Err(PortError::NotFound(msg)) => errors.push(msg),
            Err(err) => return Err(to_step_error(err)),
        }

        Ok(ValidationOutcome {
            ok: errors.is_empty(),
            errors,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationIdAt {
    pub id: DelegationId,
    pub now: DateTime<Utc>,
}

/// `ActivateDelegation` — idempotent: activating an already-active
/// delegation is a no-op (spec.md §4.2).
pub struct ActivateDelegation {
    store: Arc<dyn DelegationStore>,
}

impl ActivateDelegation {
    pub fn new(store: Arc<dyn DelegationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Step for ActivateDelegation {
    type Input = DelegationIdAt;
    type Output = ();

    fn name(&self) -> &'static str {
        "ActivateDelegation"
    }

    async fn execute(&self, input: DelegationIdAt) -> StepResult<()> {
        let delegation = self.store.get(&input.id).await.map_err(to_step_error)?;
        if delegation.phase == DelegationPhase::Active {
            return Ok(());
        }
        self.store
            .set_phase(&input.id, DelegationPhase::Active, input.now)
            .await
            .map_err(to_step_error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateDelegationInput {
    pub id: DelegationId,
    pub target_phase: DelegationPhase,
    pub now: DateTime<Utc>,
}

/// `DeactivateDelegation` — drives the delegation to whichever terminal
/// phase the caller reached (`Expired`, `Cancelled`, or `Invalid`);
/// idempotent on a delegation that has already reached a terminal phase
/// (spec.md §4.2).
pub struct DeactivateDelegation {
    store: Arc<dyn DelegationStore>,
}

impl DeactivateDelegation {
    pub fn new(store: Arc<dyn DelegationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Step for DeactivateDelegation {
    type Input = DeactivateDelegationInput;
    type Output = ();

    fn name(&self) -> &'static str {
        "DeactivateDelegation"
    }

    async fn execute(&self, input: DeactivateDelegationInput) -> StepResult<()> {
        let delegation = self.store.get(&input.id).await.map_err(to_step_error)?;
        if delegation.phase.is_terminal() {
            return Ok(());
        }
        self.store
            .set_phase(&input.id, input.target_phase, input.now)
            .await
            .map_err(to_step_error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendDelegationInput {
    pub id: DelegationId,
    pub new_end_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

/// `ExtendDelegation` (spec.md §4.2, §4.4 "rearm the timer").
pub struct ExtendDelegation {
    store: Arc<dyn DelegationStore>,
}

impl ExtendDelegation {
    pub fn new(store: Arc<dyn DelegationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Step for ExtendDelegation {
    type Input = ExtendDelegationInput;
    type Output = ();

    fn name(&self) -> &'static str {
        "ExtendDelegation"
    }

    async fn execute(&self, input: ExtendDelegationInput) -> StepResult<()> {
        self.store
            .set_end_at(&input.id, input.new_end_at, input.now)
            .await
            .map_err(to_step_error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyDelegationAmountInput {
    pub id: DelegationId,
    pub new_max_amount: Money,
    pub now: DateTime<Utc>,
}

/// `ModifyDelegationAmount` (spec.md §4.2).
pub struct ModifyDelegationAmount {
    store: Arc<dyn DelegationStore>,
}

impl ModifyDelegationAmount {
    pub fn new(store: Arc<dyn DelegationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Step for ModifyDelegationAmount {
    type Input = ModifyDelegationAmountInput;
    type Output = ();

    fn name(&self) -> &'static str {
        "ModifyDelegationAmount"
    }

    async fn execute(&self, input: ModifyDelegationAmountInput) -> StepResult<()> {
        self.store
            .set_max_amount(&input.id, input.new_max_amount, input.now)
            .await
            .map_err(to_step_error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDelegationUsageInput {
    pub request_id: RequestId,
    pub approver_id: UserId,
    pub amount: Money,
    pub now: DateTime<Utc>,
}

/// `RecordDelegationUsage` (spec.md §4.2) — finds the active delegation (if
/// any) for which `approver_id` is the delegatee and charges `amount`
/// against it, idempotent on `(requestId, approverId)`. When the approver
/// acted on their own intrinsic authority there is no delegation to charge,
/// and this is a no-op returning `None`.
pub struct RecordDelegationUsage {
    store: Arc<dyn DelegationStore>,
    usage_cap: f64,
}

impl RecordDelegationUsage {
    pub fn new(store: Arc<dyn DelegationStore>, usage_cap: f64) -> Self {
        Self { store, usage_cap }
    }
}

#[async_trait]
impl Step for RecordDelegationUsage {
    type Input = RecordDelegationUsageInput;
    type Output = Option<DelegationId>;

    fn name(&self) -> &'static str {
        "RecordDelegationUsage"
    }

    async fn execute(&self, input: RecordDelegationUsageInput) -> StepResult<Option<DelegationId>> {
        let candidates = self
            .store
            .list(&DelegationFilter::default())
            .await
            .map_err(to_step_error)?;

        let best = candidates
            .into_iter()
            .filter(|d| {
                d.to_user_id == input.approver_id
                    && d.is_active_at(input.now)
                    && input.amount <= d.headroom(self.usage_cap)
            })
            .min_by(|a, b| a.start_at.cmp(&b.start_at).then(a.created_at.cmp(&b.created_at)));

        let Some(delegation) = best else {
            return Ok(None);
        };

        let dedup_key = format!("{}:{}", input.request_id, input.approver_id);
        self.store
            .increment_used(&delegation.id, input.amount, &dedup_key, input.now)
            .await
            .map_err(to_step_error)?;
        Ok(Some(delegation.id))
    }
}
