//! Approval Workflow (C3) — deterministic orchestration of the purchase
//! request lifecycle (spec.md §4.3).

use crate::config::EngineConfig;
use crate::engine::context::{Ctx, Selected};
use crate::model::{
    ApprovalDecision, ApprovalEnvelope, CartModification, Modification, PurchaseRequest,
    RequestStatus,
};
use crate::ports::{AuditLog, Catalog, NotificationSink, PurchaseGateway, PurchaseOrder, UserDirectory};
use crate::ports::DelegationStore;
use crate::steps::{
    AuditDecision, AuditDecisionInput, ExecutePurchase, ExecutePurchaseInput, NotifyRecipient,
    NotifyRecipientInput, RecordDelegationUsage, RecordDelegationUsageInput, ResolveApprovers,
    ResolveApproversInput, ValidateApproval, ValidateApprovalInput, ValidateCatalogEntries,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, instrument};

/// Shared handle the `getStatus` query handler reads from. The workflow
/// publishes a snapshot here after every state-changing step so the query
/// handler can observe progress without advancing the workflow itself
/// (spec.md §4.3 "query handler `getStatus`").
pub type RequestStatusHandle = Arc<RwLock<PurchaseRequest>>;

fn publish(status: &RequestStatusHandle, request: &PurchaseRequest) {
    *status.write() = request.clone();
}

/// Ports and configuration the approval workflow needs to drive its steps.
/// Grounded on the teacher's pattern of handing a workflow a bundle of
/// injected collaborators rather than threading each one through every
/// call.
pub struct ApprovalDeps {
    pub catalog: Arc<dyn Catalog>,
    pub users: Arc<dyn UserDirectory>,
    pub delegations: Arc<dyn DelegationStore>,
    pub purchases: Arc<dyn PurchaseGateway>,
    pub notifications: Arc<dyn NotificationSink>,
    pub audit: Arc<dyn AuditLog>,
    pub config: EngineConfig,
}

/// Run the approval workflow to completion against `request`, suspending on
/// timers and signals through `ctx`. Returns the request in its terminal
/// state. Mirrors spec.md §4.3's step-by-step contract exactly; every
/// suspension point goes through `ctx` so replay can reproduce it.
#[instrument(skip(ctx, deps, request, status), fields(request_id = %request.id))]
pub async fn run_approval_workflow(
    ctx: &mut Ctx,
    deps: &ApprovalDeps,
    mut request: PurchaseRequest,
    status: &RequestStatusHandle,
) -> PurchaseRequest {
    publish(status, &request);
    let validate_step = ValidateCatalogEntries::new(
        deps.catalog.clone(),
        deps.config.catalog_block_terms.clone(),
        deps.config.catalog_block_ids.clone(),
    );
    let validation = ctx
        .call_step(&validate_step, request.product_refs.clone(), &deps.config.catalog_retry)
        .await;

    let validation = match validation {
        Ok(v) => v,
        Err(err) => {
            let _ = request.fail(err.to_string());
            publish(status, &request);
            notify_requester(ctx, deps, &request, &format!("validation failed: {err}")).await;
            return request;
        }
    };

    for warning in &validation.warnings {
        notify_requester(ctx, deps, &request, warning).await;
    }

    let valid_count = validation.valid.len();
    request.cart = validation.into_cart();
    publish(status, &request);

    if valid_count == 0 {
        let _ = request.reject("no valid items");
        publish(status, &request);
        info!(reason = "no valid items", "request rejected");
        notify_requester(ctx, deps, &request, "no valid items in cart").await;
        audit(ctx, deps, &request, "rejected").await;
        return request;
    }

    let resolve_step = ResolveApprovers::new(
        deps.users.clone(),
        deps.delegations.clone(),
        deps.config.threshold_high,
        deps.config.threshold_mid,
        deps.config.mid_tier_inclusive_bound,
        deps.config.delegation_usage_cap,
        deps.config.ceo_user_id.clone(),
    );
    let resolve_input = ResolveApproversInput {
        employee_id: request.employee_id.clone(),
        amount: request.cart.total_amount,
        now: ctx.now(),
    };
    let required_approvers = match ctx.call_step(&resolve_step, resolve_input, &deps.config.catalog_retry).await {
        Ok(approvers) => approvers,
        Err(err) => {
            let _ = request.fail(err.to_string());
            publish(status, &request);
            notify_requester(ctx, deps, &request, &format!("could not resolve approvers: {err}")).await;
            audit(ctx, deps, &request, "failed").await;
            return request;
        }
    };

    request.approval_flow.required_approvers = required_approvers.clone();
    request.approval_flow.deadline = Some(ctx.now() + deps.config.approval_window);
    publish(status, &request);

    if !required_approvers.is_empty() {
        let envelope = ApprovalEnvelope {
            request_id: request.id,
            employee_id: request.employee_id.clone(),
            cart: request.cart.clone(),
            justification: request.justification.clone(),
            deadline: request.approval_flow.deadline.unwrap(),
        };
        for approver in &required_approvers {
            let payload = serde_json::to_value(&envelope).unwrap_or(serde_json::Value::Null);
            notify(ctx, deps, approver, payload).await;
        }

        wait_for_decisions(ctx, deps, &mut request, status).await;
    }

    if request.status == RequestStatus::Rejected {
        audit(ctx, deps, &request, "rejected").await;
        return request;
    }

    let _ = request.approve();
    publish(status, &request);
    let order = PurchaseOrder {
        cart: request.cart.clone(),
        delivery_location: request.delivery_location.clone(),
        total_amount: request.cart.total_amount,
    };
    let purchase_step = ExecutePurchase::new(deps.purchases.clone());
    let purchase_input = ExecutePurchaseInput {
        order,
        idempotency_key: request.id.to_string(),
    };
    match ctx.call_step(&purchase_step, purchase_input, &deps.config.purchase_retry).await {
        Ok(outcome) => {
            let _ = request.complete(outcome.order_id.clone());
            publish(status, &request);
            info!(order_id = %outcome.order_id, "purchase completed");
            notify_requester(
                ctx,
                deps,
                &request,
                &format!("your order {} has been placed", outcome.order_id),
            )
            .await;
            for approver in &request.approval_flow.approved_by.clone() {
                notify(ctx, deps, approver, serde_json::json!({ "orderId": outcome.order_id })).await;
            }
            audit(ctx, deps, &request, "completed").await;
        }
        Err(err) => {
            let _ = request.fail(err.to_string());
            publish(status, &request);
            notify_requester(ctx, deps, &request, &format!("purchase failed: {err}")).await;
            audit(ctx, deps, &request, "failed").await;
        }
    }

    request
}

/// Step 7's wait loop: selects over the approval deadline timer, the
/// `approval` signal, and the `cart_modification` signal until every
/// required approver has approved or the request is rejected.
async fn wait_for_decisions(
    ctx: &mut Ctx,
    deps: &ApprovalDeps,
    request: &mut PurchaseRequest,
    status: &RequestStatusHandle,
) {
    let deadline = request.approval_flow.deadline.expect("deadline set before wait loop");

    while request.approval_flow.approved_by.len() < request.approval_flow.required_approvers.len()
        && request.status != RequestStatus::Rejected
    {
        let selected: Selected<serde_json::Value> = match ctx
            .select(deadline, &["approval", "cart_modification"])
            .await
        {
            Ok(s) => s,
            Err(_) => {
                let _ = request.fail("selector error");
                publish(status, request);
                return;
            }
        };

        match selected {
            Selected::Timer => {
                let _ = request.reject("approval timeout");
                publish(status, request);
                info!("approval deadline reached");
                return;
            }
            Selected::Cancelled => {
                let _ = request.fail("workflow cancelled");
                publish(status, request);
                return;
            }
            Selected::Signal(channel, payload) if channel == "approval" => {
                let decision: ApprovalDecision = match serde_json::from_value(payload) {
                    Ok(d) => d,
                    Err(_) => continue,
                };
                handle_approval_decision(ctx, deps, request, decision).await;
                publish(status, request);
            }
            Selected::Signal(_, payload) => {
                let modification: CartModification = match serde_json::from_value(payload) {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                request.approval_flow.push_modification(Modification {
                    modified_by: modification.modified_by,
                    modified_at: modification.modified_at,
                    reason: modification.reason,
                    change: modification.changes,
                });
                publish(status, request);
            }
        }
    }
}

async fn handle_approval_decision(
    ctx: &mut Ctx,
    deps: &ApprovalDeps,
    request: &mut PurchaseRequest,
    decision: ApprovalDecision,
) {
    // Idempotent: a repeated identical decision from an approver who has
    // already decided is a no-op (spec.md §4.3 "De-duplication").
    if request.approval_flow.has_approved(&decision.responsible_id) {
        return;
    }

    let validate_step = ValidateApproval::new(
        deps.users.clone(),
        deps.delegations.clone(),
        deps.config.delegation_usage_cap,
    );
    let valid = ctx
        .call_step(
            &validate_step,
            ValidateApprovalInput {
                approver_id: decision.responsible_id.clone(),
                amount: request.cart.total_amount,
                now: decision.at,
            },
            &deps.config.catalog_retry,
        )
        .await
        .unwrap_or(false);

    if !valid {
        info!(approver = %decision.responsible_id, "ignored approval from unauthorized approver");
        audit(ctx, deps, request, "ignored_unauthorized_approval").await;
        return;
    }

    if !decision.approved {
        let _ = request.reject(decision.reason.clone().unwrap_or_default());
        request.approval_flow.rejected_by = Some(decision.responsible_id.clone());
        request.approval_flow.rejection_reason = decision.reason;
        info!(approver = %decision.responsible_id, "request rejected by approver");
        return;
    }

    let usage_step = RecordDelegationUsage::new(deps.delegations.clone(), deps.config.delegation_usage_cap);
    let _ = ctx
        .call_step(
            &usage_step,
            RecordDelegationUsageInput {
                request_id: request.id,
                approver_id: decision.responsible_id.clone(),
                amount: request.cart.total_amount,
                now: decision.at,
            },
            &deps.config.catalog_retry,
        )
        .await;

    request.approval_flow.record_approval(decision.responsible_id.clone());

    if let Some(modified_cart) = decision.modified_cart {
        request.approval_flow.push_modification(Modification {
            modified_by: decision.responsible_id.clone(),
            modified_at: decision.at,
            reason: "cart modified at approval".to_string(),
            change: serde_json::to_value(&modified_cart).unwrap_or(serde_json::Value::Null),
        });
        request.cart = modified_cart;
        notify_requester(ctx, deps, request, "your cart was modified by an approver").await;
    }
}

async fn notify(ctx: &mut Ctx, deps: &ApprovalDeps, recipient: &crate::model::UserId, payload: serde_json::Value) {
    let step = NotifyRecipient::new(deps.notifications.clone());
    let _ = ctx
        .call_step(
            &step,
            NotifyRecipientInput {
                recipient_id: recipient.clone(),
                payload,
            },
            &deps.config.notification_retry,
        )
        .await;
}

async fn notify_requester(ctx: &mut Ctx, deps: &ApprovalDeps, request: &PurchaseRequest, message: &str) {
    notify(
        ctx,
        deps,
        &request.employee_id,
        serde_json::json!({ "requestId": request.id, "message": message }),
    )
    .await;
}

async fn audit(ctx: &mut Ctx, deps: &ApprovalDeps, request: &PurchaseRequest, kind: &str) {
    let at = ctx.now();
    let step = AuditDecision::new(deps.audit.clone());
    let _ = ctx
        .call_step(
            &step,
            AuditDecisionInput {
                subject: request.id.to_string(),
                kind: kind.to_string(),
                detail: serde_json::json!({ "status": request.status }),
                at,
            },
            &deps.config.notification_retry,
        )
        .await;
}
