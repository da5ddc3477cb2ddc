//! Property-based tests for the universal invariants of spec.md §8.
//! Generalized, randomized checks rather than scenario replays — those
//! live in `approval_workflow_tests.rs` / `delegation_workflow_tests.rs`.

use approval_workflow_engine::model::{ApprovalFlow, Cart, CartItem, Delegation, UserId};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn epoch() -> chrono::DateTime<chrono::Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap()
}

fn arb_cart_item() -> impl Strategy<Value = CartItem> {
    (1i64..10_000, 1u32..20, any::<bool>(), any::<bool>()).prop_map(|(price, quantity, valid, prohibited)| CartItem {
        product_ref: "ref".to_string(),
        product_id: Some("p".to_string()),
        title: Some("t".to_string()),
        price,
        quantity,
        valid,
        prohibited,
        error_message: None,
    })
}

proptest! {
    /// Property 1: `cart.totalAmount` equals the sum over valid,
    /// non-prohibited items of `price * quantity`, whatever mix of
    /// valid/invalid/prohibited items the cart holds.
    #[test]
    fn cart_total_matches_valid_non_prohibited_items(items in prop::collection::vec(arb_cart_item(), 0..20)) {
        let total_amount = items
            .iter()
            .filter(|i| i.valid && !i.prohibited)
            .map(CartItem::subtotal)
            .sum();
        let cart = Cart { items, total_amount, currency: "EUR".to_string() };
        prop_assert!(cart.total_amount_is_consistent());
    }

    /// Property 1 (negative case): perturbing `total_amount` away from the
    /// true sum must be caught by the same check.
    #[test]
    fn cart_total_mismatch_is_detected(items in prop::collection::vec(arb_cart_item(), 1..20), noise in 1i64..1000) {
        let true_total: i64 = items
            .iter()
            .filter(|i| i.valid && !i.prohibited)
            .map(CartItem::subtotal)
            .sum();
        let cart = Cart { items, total_amount: true_total + noise, currency: "EUR".to_string() };
        prop_assert!(!cart.total_amount_is_consistent());
    }

    /// Property 3: `approvedBy` stays a subset of `requiredApprovers` and
    /// gains no duplicates no matter how many times the same approver is
    /// recorded.
    #[test]
    fn approved_by_is_always_a_subset_with_no_duplicates(
        required in prop::collection::vec("[a-z]{1,8}", 1..6),
        decisions in prop::collection::vec(0usize..6, 0..20),
    ) {
        let required_approvers: Vec<UserId> = required.iter().map(|s| UserId::from(s.as_str())).collect();
        let mut flow = ApprovalFlow { required_approvers: required_approvers.clone(), ..Default::default() };

        for idx in decisions {
            if let Some(candidate) = required_approvers.get(idx % required_approvers.len().max(1)) {
                flow.record_approval(candidate.clone());
            }
        }

        prop_assert!(flow.approved_by_is_subset());
        let mut seen = std::collections::HashSet::new();
        for approver in &flow.approved_by {
            prop_assert!(seen.insert(approver.clone()), "duplicate approver recorded");
        }
    }

    /// Property 6: `usedAmount` never exceeds `maxAmount * usageCap`; the
    /// delegation's own bookkeeping must reject any would-be overdraft by
    /// reporting zero headroom rather than going negative.
    #[test]
    fn delegation_used_amount_never_exceeds_capped_max(
        max_amount in 1i64..100_000,
        usage_cap in 0.1f64..1.0,
        charges in prop::collection::vec(1i64..10_000, 0..10),
    ) {
        let mut delegation = Delegation::new(
            UserId::from("m@co"),
            UserId::from("s@co"),
            epoch(),
            epoch() + Duration::days(1),
            max_amount,
            "coverage".to_string(),
            epoch(),
        );

        for (i, amount) in charges.into_iter().enumerate() {
            let headroom = delegation.headroom(usage_cap);
            if amount <= headroom {
                let key = format!("dedup-{i}");
                delegation.record_usage(&key, amount, epoch());
            }
        }

        let capped_max = (max_amount as f64 * usage_cap) as i64;
        prop_assert!(delegation.used_amount <= capped_max);
        prop_assert!(delegation.headroom(usage_cap) >= 0);
    }

    /// Property 7 (idempotency primitive): recording the same usage dedup
    /// key twice charges the delegation only once.
    #[test]
    fn repeated_usage_dedup_key_charges_once(amount in 1i64..1000) {
        let mut delegation = Delegation::new(
            UserId::from("m@co"),
            UserId::from("s@co"),
            epoch(),
            epoch() + Duration::days(1),
            10_000,
            "coverage".to_string(),
            epoch(),
        );
        delegation.record_usage("req-1:approver-1", amount, epoch());
        delegation.record_usage("req-1:approver-1", amount, epoch());
        prop_assert_eq!(delegation.used_amount, amount);
    }

    /// Property 10: re-encoding a `Delegation` through the serializer is
    /// the identity.
    #[test]
    fn delegation_serde_round_trip_is_identity(max_amount in 1i64..100_000) {
        let delegation = Delegation::new(
            UserId::from("m@co"),
            UserId::from("s@co"),
            epoch(),
            epoch() + Duration::days(1),
            max_amount,
            "coverage".to_string(),
            epoch(),
        );
        let encoded = serde_json::to_string(&delegation).unwrap();
        let decoded: Delegation = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(decoded.id, delegation.id);
        prop_assert_eq!(decoded.max_amount, delegation.max_amount);
        prop_assert_eq!(decoded.from_user_id, delegation.from_user_id);
        prop_assert_eq!(decoded.to_user_id, delegation.to_user_id);
    }
}
