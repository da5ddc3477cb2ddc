//! Integration tests for the approval workflow (spec.md §4.3, §8 scenarios
//! S1-S6). Each test drives `run_approval_workflow` as a spawned task and
//! posts signals through the `SignalBox` the fixture hands back, mirroring
//! how `WorkflowEngine` itself drives a live instance.

mod support;

use approval_workflow_engine::model::{
    ApprovalDecision, PurchaseRequest, RequestStatus, UserId,
};
use approval_workflow_engine::ports::{CatalogEntry, DelegationStore};
use approval_workflow_engine::workflows::run_approval_workflow;
use chrono::Duration;
use parking_lot::RwLock;
use std::sync::Arc;
use support::{epoch, Fixture};

fn new_request(employee: &str, refs: &[&str]) -> PurchaseRequest {
    PurchaseRequest::new(
        UserId::from(employee),
        refs.iter().map(|r| r.to_string()).collect(),
        "team onboarding".to_string(),
        "HQ".to_string(),
        epoch(),
    )
}

#[tokio::test]
async fn s1_happy_path_single_approver() {
    let fixture = Fixture::new();
    let deps = fixture.approval_deps();
    let request = new_request("e@co", &["REF-A"]);
    let (mut ctx, signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));

    let status_clone = status.clone();
    let deps_arc = Arc::new(deps);
    let deps_for_task = deps_arc.clone();
    let handle = tokio::spawn(async move {
        run_approval_workflow(&mut ctx, &deps_for_task, request, &status_clone).await
    });

    // Let the workflow run up to the wait point, then approve as manager.
    tokio::task::yield_now().await;
    signals.post(
        "approval",
        serde_json::to_value(ApprovalDecision {
            request_id: status.read().id,
            responsible_id: UserId::from("m@co"),
            approved: true,
            reason: None,
            modified_cart: None,
            at: epoch(),
        })
        .unwrap(),
    );

    let result = handle.await.unwrap();
    assert_eq!(result.status, RequestStatus::Completed);
    assert_eq!(result.approval_flow.approved_by, vec![UserId::from("m@co")]);
    assert_eq!(result.cart.total_amount, 120);
    assert_eq!(fixture.purchases.placement_count(), 1);
}

#[tokio::test]
async fn s2_rejection() {
    let fixture = Fixture::new();
    let deps = Arc::new(fixture.approval_deps());
    let request = new_request("e@co", &["REF-A"]);
    let request_id = request.id;
    let (mut ctx, signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));
    let status_clone = status.clone();
    let deps_for_task = deps.clone();

    let handle = tokio::spawn(async move {
        run_approval_workflow(&mut ctx, &deps_for_task, request, &status_clone).await
    });

    tokio::task::yield_now().await;
    signals.post(
        "approval",
        serde_json::to_value(ApprovalDecision {
            request_id,
            responsible_id: UserId::from("m@co"),
            approved: false,
            reason: Some("out of budget".to_string()),
            modified_cart: None,
            at: epoch(),
        })
        .unwrap(),
    );

    let result = handle.await.unwrap();
    assert_eq!(result.status, RequestStatus::Rejected);
    assert_eq!(result.approval_flow.rejected_by, Some(UserId::from("m@co")));
    assert_eq!(fixture.purchases.placement_count(), 0);
}

#[tokio::test]
async fn s3_prohibited_items_reject_with_no_approver_resolution() {
    let fixture = Fixture::new();
    let deps = fixture.approval_deps();
    let request = new_request("e@co", &["REF-X"]);
    let (mut ctx, _signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));

    let result = run_approval_workflow(&mut ctx, &deps, request, &status).await;

    assert_eq!(result.status, RequestStatus::Rejected);
    assert!(result.approval_flow.required_approvers.is_empty());
    assert_eq!(fixture.purchases.placement_count(), 0);
}

#[tokio::test]
async fn s4_timeout_rejects_with_reason() {
    let fixture = Fixture::new();
    let deps = Arc::new(fixture.approval_deps());
    let request = new_request("e@co", &["REF-A"]);
    let (mut ctx, _signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));
    let status_clone = status.clone();
    let deps_for_task = deps.clone();
    let clock = fixture.clock.clone();

    let handle = tokio::spawn(async move {
        run_approval_workflow(&mut ctx, &deps_for_task, request, &status_clone).await
    });

    tokio::task::yield_now().await;
    clock.advance(Duration::days(7) + Duration::seconds(1));

    let result = handle.await.unwrap();
    assert_eq!(result.status, RequestStatus::Rejected);
    assert!(result
        .rejection_reason
        .as_deref()
        .unwrap_or_default()
        .contains("timeout"));
    assert_eq!(fixture.purchases.placement_count(), 0);
}

#[tokio::test]
async fn s5_delegation_substitution_charges_delegate() {
    use approval_workflow_engine::model::Delegation;

    let fixture = Fixture::new();
    let delegation = Delegation::new(
        UserId::from("m@co"),
        UserId::from("s@co"),
        epoch() - Duration::hours(1),
        epoch() + Duration::days(1),
        500,
        "coverage".to_string(),
        epoch(),
    );
    let mut active = delegation.clone();
    active.schedule(epoch()).unwrap();
    active.activate(epoch()).unwrap();
    fixture.delegations.put(active.clone()).await.unwrap();

    let deps = Arc::new(fixture.approval_deps());
    let request = new_request("e@co", &["REF-A"]);
    let request_id = request.id;
    let (mut ctx, signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));
    let status_clone = status.clone();
    let deps_for_task = deps.clone();

    let handle = tokio::spawn(async move {
        run_approval_workflow(&mut ctx, &deps_for_task, request, &status_clone).await
    });

    tokio::task::yield_now().await;
    {
        let snapshot = status.read().clone();
        assert_eq!(snapshot.approval_flow.required_approvers, vec![UserId::from("s@co")]);
    }
    signals.post(
        "approval",
        serde_json::to_value(ApprovalDecision {
            request_id,
            responsible_id: UserId::from("s@co"),
            approved: true,
            reason: None,
            modified_cart: None,
            at: epoch(),
        })
        .unwrap(),
    );

    let result = handle.await.unwrap();
    assert_eq!(result.status, RequestStatus::Completed);

    let updated = fixture.delegations.get(&active.id).await.unwrap();
    assert_eq!(updated.used_amount, 120);
}

#[tokio::test]
async fn s6_duplicate_approval_signal_is_idempotent() {
    let fixture = Fixture::new();
    let deps = Arc::new(fixture.approval_deps());
    let request = new_request("e@co", &["REF-A"]);
    let request_id = request.id;
    let (mut ctx, signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));
    let status_clone = status.clone();
    let deps_for_task = deps.clone();

    let handle = tokio::spawn(async move {
        run_approval_workflow(&mut ctx, &deps_for_task, request, &status_clone).await
    });

    tokio::task::yield_now().await;
    for _ in 0..2 {
        signals.post(
            "approval",
            serde_json::to_value(ApprovalDecision {
                request_id,
                responsible_id: UserId::from("m@co"),
                approved: true,
                reason: None,
                modified_cart: None,
                at: epoch(),
            })
            .unwrap(),
        );
    }

    let result = handle.await.unwrap();
    assert_eq!(result.status, RequestStatus::Completed);
    assert_eq!(result.approval_flow.approved_by, vec![UserId::from("m@co")]);
    assert_eq!(fixture.purchases.placement_count(), 1);
}

#[tokio::test]
async fn boundary_13_approval_after_timeout_rejection_is_ignored() {
    let fixture = Fixture::new();
    let deps = Arc::new(fixture.approval_deps());
    let request = new_request("e@co", &["REF-A"]);
    let request_id = request.id;
    let (mut ctx, signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));
    let status_clone = status.clone();
    let deps_for_task = deps.clone();
    let clock = fixture.clock.clone();

    let handle = tokio::spawn(async move {
        run_approval_workflow(&mut ctx, &deps_for_task, request, &status_clone).await
    });

    tokio::task::yield_now().await;
    clock.advance(Duration::days(7) + Duration::seconds(1));
    let result = handle.await.unwrap();
    assert_eq!(result.status, RequestStatus::Rejected);

    // An approval arriving after the instance has already returned has
    // nowhere to land: the signal box it was posted to belongs to a
    // finished instance, so it is simply never observed.
    signals.post(
        "approval",
        serde_json::to_value(ApprovalDecision {
            request_id,
            responsible_id: UserId::from("m@co"),
            approved: true,
            reason: None,
            modified_cart: None,
            at: epoch(),
        })
        .unwrap(),
    );
    assert_eq!(result.status, RequestStatus::Rejected);
}

#[tokio::test]
async fn catalog_validation_failure_fails_request() {
    let fixture = Fixture::new();
    fixture
        .catalog
        .fail_with("REF-A", approval_workflow_engine::ports::PortError::Terminal("catalog down".to_string()));
    let deps = fixture.approval_deps();
    let request = new_request("e@co", &["REF-A"]);
    let (mut ctx, _signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));

    let result = run_approval_workflow(&mut ctx, &deps, request, &status).await;
    assert_eq!(result.status, RequestStatus::Failed);
}

#[tokio::test]
async fn mixed_currency_cart_is_rejected_as_invalid() {
    let fixture = Fixture::new();
    fixture.catalog.seed(
        "REF-USD",
        CatalogEntry {
            product_id: "P3".to_string(),
            title: "Mouse".to_string(),
            price: 20,
            currency: "USD".to_string(),
            image_ref: None,
        },
    );
    let deps = fixture.approval_deps();
    let request = new_request("e@co", &["REF-A", "REF-USD"]);
    let (mut ctx, _signals, _cancellation) = fixture.ctx(request.id.to_string());
    let status = Arc::new(RwLock::new(request.clone()));

    let result = run_approval_workflow(&mut ctx, &deps, request, &status).await;
    assert_eq!(result.status, RequestStatus::Failed);
}
