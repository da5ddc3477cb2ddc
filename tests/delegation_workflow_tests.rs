//! Integration tests for the delegation workflow (spec.md §4.4, §8
//! scenario S7 and boundary behavior 14).

mod support;

use approval_workflow_engine::model::{
    CancelDelegation, Delegation, DelegationModificationAction, DelegationPhase, ModifyDelegation,
    UserId,
};
use approval_workflow_engine::ports::DelegationStore;
use approval_workflow_engine::workflows::{get_delegation_status, run_delegation_workflow};
use chrono::Duration;
use std::sync::Arc;
use support::{epoch, Fixture};

fn new_delegation(max_amount: i64, end_in: Duration) -> Delegation {
    Delegation::new(
        UserId::from("m@co"),
        UserId::from("s@co"),
        epoch(),
        epoch() + end_in,
        max_amount,
        "coverage".to_string(),
        epoch(),
    )
}

#[tokio::test]
async fn s7_cancel_mid_flight() {
    let fixture = Fixture::new();
    let deps = Arc::new(fixture.delegation_deps());
    let delegation = new_delegation(500, Duration::days(5));
    let delegation_id = delegation.id;
    let (mut ctx, signals, _cancellation) = fixture.ctx(delegation.id.to_string());
    let clock = fixture.clock.clone();
    let deps_for_task = deps.clone();

    let handle = tokio::spawn(async move { run_delegation_workflow(&mut ctx, &deps_for_task, delegation).await });

    tokio::task::yield_now().await;
    clock.advance(Duration::days(2));
    tokio::task::yield_now().await;
    signals.post(
        "cancel_delegation",
        serde_json::to_value(CancelDelegation {
            by: UserId::from("m@co"),
            reason: "no longer needed".to_string(),
        })
        .unwrap(),
    );

    let outcome = handle.await.unwrap();
    assert_eq!(outcome.status, DelegationPhase::Cancelled);
    assert_eq!(outcome.message, "no longer needed");

    let stored = fixture.delegations.get(&delegation_id).await.unwrap();
    assert_eq!(stored.phase, DelegationPhase::Cancelled);

    let status = get_delegation_status(&stored, clock.now());
    assert!(!status.active);
}

#[tokio::test]
async fn boundary_14_one_second_window_activates_then_deactivates() {
    let fixture = Fixture::new();
    let deps = Arc::new(fixture.delegation_deps());
    let delegation = new_delegation(100, Duration::seconds(1));
    let delegation_id = delegation.id;
    let (mut ctx, _signals, _cancellation) = fixture.ctx(delegation.id.to_string());
    let clock = fixture.clock.clone();
    let deps_for_task = deps.clone();

    let handle = tokio::spawn(async move { run_delegation_workflow(&mut ctx, &deps_for_task, delegation).await });

    tokio::task::yield_now().await;
    clock.advance(Duration::seconds(1));

    let outcome = handle.await.unwrap();
    assert_eq!(outcome.status, DelegationPhase::Expired);

    let history = fixture.audit.history(&delegation_id.to_string()).await.unwrap();
    let kinds: Vec<&str> = history.iter().map(|e| e.kind.as_str()).collect();
    assert!(kinds.contains(&"expired"));
}

#[tokio::test]
async fn extend_delegation_updates_deadline() {
    let fixture = Fixture::new();
    let deps = Arc::new(fixture.delegation_deps());
    let delegation = new_delegation(100, Duration::days(1));
    let delegation_id = delegation.id;
    let (mut ctx, signals, _cancellation) = fixture.ctx(delegation.id.to_string());
    let clock = fixture.clock.clone();
    let deps_for_task = deps.clone();

    let handle = tokio::spawn(async move { run_delegation_workflow(&mut ctx, &deps_for_task, delegation).await });

    tokio::task::yield_now().await;
    signals.post(
        "modify_delegation",
        serde_json::to_value(ModifyDelegation {
            action: DelegationModificationAction::Extend,
            new_end_at: Some(epoch() + Duration::days(3)),
            new_max_amount: None,
            by: UserId::from("m@co"),
            reason: "extended coverage".to_string(),
        })
        .unwrap(),
    );
    tokio::task::yield_now().await;

    // The original 1-day deadline firing must not terminate the workflow;
    // it should rearm against the extended deadline instead.
    clock.advance(Duration::days(1) + Duration::seconds(1));
    tokio::task::yield_now().await;
    let stored = fixture.delegations.get(&delegation_id).await.unwrap();
    assert_eq!(stored.phase, DelegationPhase::Active);

    clock.advance(Duration::days(2));
    let outcome = handle.await.unwrap();
    assert_eq!(outcome.status, DelegationPhase::Expired);
}

#[tokio::test]
async fn invalid_delegation_structure_is_rejected_without_activation() {
    let fixture = Fixture::new();
    let deps = fixture.delegation_deps();
    let delegation = Delegation::new(
        UserId::from("m@co"),
        UserId::from("m@co"),
        epoch(),
        epoch() + Duration::days(1),
        100,
        "self-delegation".to_string(),
        epoch(),
    );
    let (mut ctx, _signals, _cancellation) = fixture.ctx(delegation.id.to_string());

    let outcome = run_delegation_workflow(&mut ctx, &deps, delegation).await;
    assert_eq!(outcome.status, DelegationPhase::Invalid);
}
