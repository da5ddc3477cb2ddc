//! `PurchaseGateway` port — places the external order (spec.md §6.1,
//! §4.2 `ExecutePurchase`). Idempotent on the supplied key.

use super::catalog::PortError;
use crate::model::{Cart, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub cart: Cart,
    pub delivery_location: String,
    pub total_amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Accepted,
    Rejected,
    InsufficientFunds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub order_id: String,
    pub status: PurchaseStatus,
}

#[async_trait]
pub trait PurchaseGateway: Send + Sync {
    /// `idempotency_key` is the `requestId`; a retry with the same key must
    /// not double-order.
    async fn place(
        &self,
        order: &PurchaseOrder,
        idempotency_key: &str,
    ) -> Result<PurchaseOutcome, PortError>;
}
