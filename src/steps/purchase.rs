//! `ExecutePurchase` (spec.md §4.2) — posts the order to the external
//! vendor. Idempotency key is the `requestId`; the engine's replay
//! guarantee bounds this to at most one real invocation across retries
//! (spec.md §8 property 8).

use crate::engine::step::{Step, StepError, StepResult};
use crate::ports::{PortError, PurchaseGateway, PurchaseOrder, PurchaseOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutePurchaseInput {
    pub order: PurchaseOrder,
    pub idempotency_key: String,
}

pub struct ExecutePurchase {
    gateway: Arc<dyn PurchaseGateway>,
}

impl ExecutePurchase {
    pub fn new(gateway: Arc<dyn PurchaseGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Step for ExecutePurchase {
    type Input = ExecutePurchaseInput;
    type Output = PurchaseOutcome;

    fn name(&self) -> &'static str {
        "ExecutePurchase"
    }

    async fn execute(&self, input: ExecutePurchaseInput) -> StepResult<PurchaseOutcome> {
        self.gateway
            .place(&input.order, &input.idempotency_key)
            .await
            .map_err(|err| match err {
                PortError::Transient(msg) => StepError::retriable(msg),
                PortError::NotFound(msg) | PortError::Terminal(msg) => StepError::terminal(msg),
            })
    }
}
