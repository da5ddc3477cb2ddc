use crate::ports::{PortError, PurchaseGateway, PurchaseOrder, PurchaseOutcome, PurchaseStatus};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

/// Fake purchase gateway enforcing the same idempotency contract the real
/// one must (spec.md §8 property 8): a repeated `idempotency_key` returns
/// the first outcome without placing a second order.
#[derive(Default)]
pub struct InMemoryPurchaseGateway {
    outcomes: DashMap<String, PurchaseOutcome>,
    placements: Mutex<Vec<String>>,
    force_error: DashMap<String, PortError>,
}

impl InMemoryPurchaseGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, idempotency_key: impl Into<String>, err: PortError) -> &Self {
        self.force_error.insert(idempotency_key.into(), err);
        self
    }

    /// Number of distinct idempotency keys actually placed — the property
    /// test asserts this never exceeds one per `requestId`.
    pub fn placement_count(&self) -> usize {
        self.placements.lock().len()
    }
}

#[async_trait]
impl PurchaseGateway for InMemoryPurchaseGateway {
    async fn place(&self, order: &PurchaseOrder, idempotency_key: &str) -> Result<PurchaseOutcome, PortError> {
        if let Some((_, err)) = self.force_error.remove(idempotency_key) {
            return Err(err);
        }
        if let Some(existing) = self.outcomes.get(idempotency_key) {
            return Ok(existing.clone());
        }
        self.placements.lock().push(idempotency_key.to_string());
        let outcome = PurchaseOutcome {
            order_id: format!("order-{idempotency_key}"),
            status: if order.total_amount > 0 {
                PurchaseStatus::Accepted
            } else {
                PurchaseStatus::Rejected
            },
        };
        self.outcomes.insert(idempotency_key.to_string(), outcome.clone());
        Ok(outcome)
    }
}
