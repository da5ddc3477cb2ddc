//! Delegation Workflow (C4) — deterministic orchestration of a delegation's
//! lifecycle (spec.md §4.4).

use crate::config::EngineConfig;
use crate::engine::context::{Ctx, Selected};
use crate::model::{
    CancelDelegation, Delegation, DelegationModificationAction, DelegationPhase, ModifyDelegation,
};
use crate::ports::{AuditLog, DelegationStore, UserDirectory};
use crate::steps::{
    ActivateDelegation, AuditDecision, AuditDecisionInput, DeactivateDelegation,
    DeactivateDelegationInput, DelegationIdAt, ExtendDelegation, ExtendDelegationInput,
    ModifyDelegationAmount, ModifyDelegationAmountInput, ValidateDelegation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct DelegationDeps {
    pub users: Arc<dyn UserDirectory>,
    pub store: Arc<dyn DelegationStore>,
    pub audit: Arc<dyn AuditLog>,
    pub config: EngineConfig,
}

/// Terminal outcome of a delegation workflow instance (spec.md §4.4
/// "Public contract").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationOutcome {
    pub delegation_id: crate::model::DelegationId,
    pub status: DelegationPhase,
    pub message: String,
}

/// Run the delegation workflow to completion. Mirrors spec.md §4.4's
/// step-by-step contract; the timer-rearm-on-extend rule is implemented by
/// re-reading `end_at` from the store each time the timer fires rather than
/// by cancelling an in-flight sleep, exactly as the spec's fallback
/// instructs for engines that cannot cancel a timer.
#[instrument(skip(ctx, deps, delegation), fields(delegation_id = %delegation.id))]
pub async fn run_delegation_workflow(
    ctx: &mut Ctx,
    deps: &DelegationDeps,
    mut delegation: Delegation,
) -> DelegationOutcome {
    let validate_step = ValidateDelegation::new(deps.users.clone());
    let outcome = ctx
        .call_step(&validate_step, delegation.clone(), &deps.config.catalog_retry)
        .await;

    let validation = match outcome {
        Ok(v) => v,
        Err(err) => {
            return terminal(ctx, deps, &mut delegation, DelegationPhase::Invalid, err.to_string()).await;
        }
    };
    if !validation.ok {
        let message = validation.errors.join("; ");
        return terminal(ctx, deps, &mut delegation, DelegationPhase::Invalid, message).await;
    }

    let _ = deps.store.put(delegation.clone()).await;
    let _ = delegation.schedule(ctx.now());

    if delegation.start_at > ctx.now() {
        ctx.sleep_until(delegation.start_at).await;
    }

    let activate_step = ActivateDelegation::new(deps.store.clone());
    let now = ctx.now();
    if ctx
        .call_step(&activate_step, DelegationIdAt { id: delegation.id, now }, &deps.config.catalog_retry)
        .await
        .is_err()
    {
        return terminal(ctx, deps, &mut delegation, DelegationPhase::Invalid, "activation failed".to_string()).await;
    }
    let _ = delegation.activate(now);
    info!("delegation activated");

    loop {
        let selected: Selected<serde_json::Value> = match ctx
            .select(delegation.end_at, &["modify_delegation", "cancel_delegation"])
            .await
        {
            Ok(s) => s,
            Err(_) => {
                return terminal(ctx, deps, &mut delegation, DelegationPhase::Invalid, "selector error".to_string())
                    .await;
            }
        };

        match selected {
            Selected::Timer => {
                let current_end_at = deps
                    .store
                    .get(&delegation.id)
                    .await
                    .map(|d| d.end_at)
                    .unwrap_or(delegation.end_at);
                if current_end_at != delegation.end_at {
                    // The fire was for a superseded deadline; re-sync and
                    // keep waiting at the new deadline (spec.md §4.4
                    // "rearm the timer").
                    delegation.end_at = current_end_at;
                    continue;
                }
                if ctx.now() < delegation.end_at {
                    continue;
                }
                return deactivate(ctx, deps, &mut delegation, DelegationPhase::Expired, "delegation window elapsed".to_string())
                    .await;
            }
            Selected::Cancelled => {
                return deactivate(ctx, deps, &mut delegation, DelegationPhase::Cancelled, "workflow cancelled".to_string())
                    .await;
            }
            Selected::Signal(channel, payload) if channel == "modify_delegation" => {
                let modify: ModifyDelegation = match serde_json::from_value(payload) {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                handle_modify(ctx, deps, &mut delegation, modify).await;
            }
            Selected::Signal(_, payload) => {
                let cancel: CancelDelegation = match serde_json::from_value(payload) {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                return deactivate(ctx, deps, &mut delegation, DelegationPhase::Cancelled, cancel.reason).await;
            }
        }
    }
}

async fn handle_modify(ctx: &mut Ctx, deps: &DelegationDeps, delegation: &mut Delegation, modify: ModifyDelegation) {
    let now = ctx.now();
    match modify.action {
        DelegationModificationAction::Extend => {
            let Some(new_end_at) = modify.new_end_at else { return };
            let step = ExtendDelegation::new(deps.store.clone());
            if ctx
                .call_step(&step, ExtendDelegationInput { id: delegation.id, new_end_at, now }, &deps.config.catalog_retry)
                .await
                .is_ok()
            {
                delegation.extend(new_end_at, now);
                info!(new_end_at = %new_end_at, "delegation extended");
            }
        }
        DelegationModificationAction::ModifyAmount => {
            let Some(new_max_amount) = modify.new_max_amount else { return };
            let step = ModifyDelegationAmount::new(deps.store.clone());
            if ctx
                .call_step(
                    &step,
                    ModifyDelegationAmountInput { id: delegation.id, new_max_amount, now },
                    &deps.config.catalog_retry,
                )
                .await
                .is_ok()
            {
                delegation.set_max_amount(new_max_amount, now);
                info!(new_max_amount, "delegation amount modified");
            }
        }
    }
}

async fn deactivate(
    ctx: &mut Ctx,
    deps: &DelegationDeps,
    delegation: &mut Delegation,
    target_phase: DelegationPhase,
    reason: String,
) -> DelegationOutcome {
    let now = ctx.now();
    let step = DeactivateDelegation::new(deps.store.clone());
    let _ = ctx
        .call_step(
            &step,
            DeactivateDelegationInput { id: delegation.id, target_phase, now },
            &deps.config.catalog_retry,
        )
        .await;
    match target_phase {
        DelegationPhase::Expired => {
            let _ = delegation.expire(now);
        }
        DelegationPhase::Cancelled => {
            let _ = delegation.cancel(now);
        }
        _ => {
            let _ = delegation.invalidate(now);
        }
    }
    terminal(ctx, deps, delegation, target_phase, reason).await
}

async fn terminal(
    ctx: &mut Ctx,
    deps: &DelegationDeps,
    delegation: &mut Delegation,
    status: DelegationPhase,
    message: String,
) -> DelegationOutcome {
    let at = ctx.now();
    let step = AuditDecision::new(deps.audit.clone());
    let _ = ctx
        .call_step(
            &step,
            AuditDecisionInput {
                subject: delegation.id.to_string(),
                kind: format!("{:?}", status).to_lowercase(),
                detail: serde_json::json!({ "message": message }),
                at,
            },
            &deps.config.notification_retry,
        )
        .await;
    info!(status = ?status, %message, "delegation workflow terminal");
    DelegationOutcome {
        delegation_id: delegation.id,
        status,
        message,
    }
}

/// Query handler `getDelegationStatus` (spec.md §4.4 step 4). Pure, fast,
/// not a suspension point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationStatus {
    pub active: bool,
    pub phase: DelegationPhase,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub last_modified: chrono::DateTime<chrono::Utc>,
    pub used_amount: crate::model::Money,
}

pub fn get_delegation_status(delegation: &Delegation, now: chrono::DateTime<chrono::Utc>) -> DelegationStatus {
    DelegationStatus {
        active: delegation.is_active_at(now),
        phase: delegation.phase,
        started_at: delegation.start_at,
        expires_at: delegation.end_at,
        last_modified: delegation.modified_at,
        used_amount: delegation.used_amount,
    }
}
