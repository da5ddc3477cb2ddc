//! `WorkflowEngine` — the instance registry behind the public interface of
//! spec.md §6.2. Grounded on
//! `knhk-workflow-engine::executor::engine::WorkflowEngine`'s `DashMap`-held
//! live-instance god-struct, one spawned task per running instance.

use super::state::StateStore;
use crate::config::EngineConfig;
use crate::engine::{CancellationToken, History, SignalBox, SimulatedTimebase, SystemTimebase, Timebase};
use crate::engine::context::Ctx;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{
    CancelDelegation, Delegation, DelegationId, Money, ModifyDelegation, PurchaseRequest,
    RequestId, UserId,
};
use crate::ports::{AuditLog, Catalog, DelegationStore, NotificationSink, PurchaseGateway, UserDirectory};
use crate::workflows::delegation::{get_delegation_status, DelegationDeps, DelegationOutcome, DelegationStatus};
use crate::workflows::{run_approval_workflow, ApprovalDeps, RequestStatusHandle};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

struct ApprovalHandleInner {
    status: RequestStatusHandle,
    signals: SignalBox,
    #[allow(dead_code)]
    cancellation: CancellationToken,
    #[allow(dead_code)]
    join: JoinHandle<PurchaseRequest>,
}

/// A handle to a running (or completed) approval workflow instance.
pub struct ApprovalHandle(ApprovalHandleInner);

struct DelegationHandleInner {
    signals: SignalBox,
    #[allow(dead_code)]
    cancellation: CancellationToken,
    #[allow(dead_code)]
    join: JoinHandle<DelegationOutcome>,
}

pub struct DelegationHandle(DelegationHandleInner);

/// The engine: owns the injected ports, a registry of live instances, and
/// the durable history store. Construct once per process; `submit_request`
/// / `start_delegation` spawn new workflow instances onto the `tokio`
/// runtime the caller is already running on.
pub struct WorkflowEngine {
    approval_deps: Arc<ApprovalDeps>,
    delegation_deps: Arc<DelegationDeps>,
    delegation_store: Arc<dyn DelegationStore>,
    timebase: Arc<dyn Timebase>,
    state: Arc<StateStore>,
    requests: DashMap<RequestId, ApprovalHandle>,
    delegations: DashMap<DelegationId, DelegationHandle>,
}

/// Bundle of ports the engine is constructed with (spec.md §6.1).
pub struct EnginePorts {
    pub catalog: Arc<dyn Catalog>,
    pub users: Arc<dyn UserDirectory>,
    pub delegations: Arc<dyn DelegationStore>,
    pub purchases: Arc<dyn PurchaseGateway>,
    pub notifications: Arc<dyn NotificationSink>,
    pub audit: Arc<dyn AuditLog>,
}

impl WorkflowEngine {
    pub fn new(ports: EnginePorts, config: EngineConfig, state: Arc<StateStore>) -> Self {
        let approval_deps = Arc::new(ApprovalDeps {
            catalog: ports.catalog,
            users: ports.users.clone(),
            delegations: ports.delegations.clone(),
            purchases: ports.purchases,
            notifications: ports.notifications.clone(),
            audit: ports.audit.clone(),
            config: config.clone(),
        });
        let delegation_deps = Arc::new(DelegationDeps {
            users: ports.users,
            store: ports.delegations.clone(),
            audit: ports.audit,
            config,
        });
        Self {
            approval_deps,
            delegation_deps,
            delegation_store: ports.delegations,
            timebase: Arc::new(SystemTimebase),
            state,
            requests: DashMap::new(),
            delegations: DashMap::new(),
        }
    }

    /// Constructor for tests: swaps the real clock for a `SimulatedTimebase`
    /// so a 7-day approval window can be driven without a real sleep.
    pub fn with_simulated_clock(
        ports: EnginePorts,
        config: EngineConfig,
        state: Arc<StateStore>,
        clock: Arc<SimulatedTimebase>,
    ) -> Self {
        let mut engine = Self::new(ports, config, state);
        engine.timebase = clock;
        engine
    }

    /// **Submit a purchase request** (spec.md §6.2) — starts a new approval
    /// workflow instance; its id is the `requestId`.
    pub fn submit_request(
        &self,
        employee_id: UserId,
        product_refs: Vec<String>,
        justification: String,
        delivery_location: String,
    ) -> RequestId {
        let now = self.timebase.now();
        let request = PurchaseRequest::new(employee_id, product_refs, justification, delivery_location, now);
        let request_id = request.id;

        let signals = SignalBox::new();
        let cancellation = CancellationToken::new();
        let status: RequestStatusHandle = Arc::new(parking_lot::RwLock::new(request.clone()));

        let ctx_signals = signals.clone();
        let ctx_cancellation = cancellation.clone();
        let timebase = self.timebase.clone();
        let deps = self.approval_deps.clone();
        let status_for_task = status.clone();
        let state = self.state.clone();
        let instance_id = request_id.to_string();

        let join = tokio::spawn(async move {
            let mut ctx = Ctx::new(History::new(), timebase, ctx_signals, ctx_cancellation, instance_id.clone());
            let result = run_approval_workflow(&mut ctx, &deps, request, &status_for_task).await;
            let _ = state.save_history(&instance_id, ctx.history());
            info!(request_id = %result.id, status = ?result.status, "approval workflow instance finished");
            result
        });

        self.requests.insert(
            request_id,
            ApprovalHandle(ApprovalHandleInner {
                status,
                signals,
                cancellation,
                join,
            }),
        );
        request_id
    }

    /// **Send approval decision** (spec.md §6.2).
    pub fn send_approval_decision(&self, request_id: RequestId, decision: crate::model::ApprovalDecision) -> WorkflowResult<()> {
        let handle = self
            .requests
            .get(&request_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("request {request_id}")))?;
        let payload = serde_json::to_value(decision)?;
        handle.0.signals.post("approval", payload);
        Ok(())
    }

    /// **Send cart modification** (spec.md §6.2).
    pub fn send_cart_modification(&self, request_id: RequestId, modification: crate::model::CartModification) -> WorkflowResult<()> {
        let handle = self
            .requests
            .get(&request_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("request {request_id}")))?;
        let payload = serde_json::to_value(modification)?;
        handle.0.signals.post("cart_modification", payload);
        Ok(())
    }

    /// **Query status** — invokes `getStatus` (spec.md §6.2, §4.3).
    pub fn query_status(&self, request_id: RequestId) -> WorkflowResult<PurchaseRequest> {
        let handle = self
            .requests
            .get(&request_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("request {request_id}")))?;
        Ok(handle.0.status.read().clone())
    }

    /// **Start delegation** (spec.md §6.2) — starts a new delegation
    /// workflow instance; id is `delegationId`.
    pub fn start_delegation(
        &self,
        from_user_id: UserId,
        to_user_id: UserId,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        max_amount: Money,
        reason: String,
    ) -> DelegationId {
        let now = self.timebase.now();
        let delegation = Delegation::new(from_user_id, to_user_id, start_at, end_at, max_amount, reason, now);
        let delegation_id = delegation.id;

        let signals = SignalBox::new();
        let cancellation = CancellationToken::new();
        let ctx_signals = signals.clone();
        let ctx_cancellation = cancellation.clone();
        let timebase = self.timebase.clone();
        let deps = self.delegation_deps.clone();
        let state = self.state.clone();
        let instance_id = delegation_id.to_string();

        let join = tokio::spawn(async move {
            let mut ctx = Ctx::new(History::new(), timebase, ctx_signals, ctx_cancellation, instance_id.clone());
            let outcome = crate::workflows::delegation::run_delegation_workflow(&mut ctx, &deps, delegation).await;
            let _ = state.save_history(&instance_id, ctx.history());
            info!(delegation_id = %outcome.delegation_id, status = ?outcome.status, "delegation workflow instance finished");
            outcome
        });

        self.delegations.insert(
            delegation_id,
            DelegationHandle(DelegationHandleInner {
                signals,
                cancellation,
                join,
            }),
        );
        delegation_id
    }

    /// **Modify delegation** (spec.md §6.2).
    pub fn modify_delegation(&self, delegation_id: DelegationId, modify: ModifyDelegation) -> WorkflowResult<()> {
        let handle = self
            .delegations
            .get(&delegation_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("delegation {delegation_id}")))?;
        let payload = serde_json::to_value(modify)?;
        handle.0.signals.post("modify_delegation", payload);
        Ok(())
    }

    /// **Cancel delegation** (spec.md §6.2) — graceful, via signal (spec.md
    /// §5 "User-initiated cancellation of a delegation flows through the
    /// `cancel_delegation` signal").
    pub fn cancel_delegation(&self, delegation_id: DelegationId, cancel: CancelDelegation) -> WorkflowResult<()> {
        let handle = self
            .delegations
            .get(&delegation_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("delegation {delegation_id}")))?;
        let payload = serde_json::to_value(cancel)?;
        handle.0.signals.post("cancel_delegation", payload);
        Ok(())
    }

    /// **Query delegation** — invokes `getDelegationStatus` (spec.md §6.2,
    /// §4.4 step 4). Backed directly by the `DelegationStore`, which is the
    /// serialization point every step writes through.
    pub async fn query_delegation(&self, delegation_id: DelegationId) -> WorkflowResult<DelegationStatus> {
        let delegation = self
            .delegation_store
            .get(&delegation_id)
            .await
            .map_err(|e| WorkflowError::NotFound(e.to_string()))?;
        Ok(get_delegation_status(&delegation, self.timebase.now()))
    }

    /// Request engine-initiated cancellation of a running approval
    /// instance (spec.md §4.1 "Cancellation").
    pub fn cancel_request(&self, request_id: RequestId, reason: impl Into<String>) -> WorkflowResult<()> {
        let handle = self
            .requests
            .get(&request_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("request {request_id}")))?;
        handle.0.cancellation.cancel(reason);
        Ok(())
    }
}
