//! `PurchaseRequest` — the aggregate the approval workflow owns (spec.md §3).

use super::approval_flow::ApprovalFlow;
use super::cart::Cart;
use super::ids::{RequestId, UserId};
use crate::error::{WorkflowError, WorkflowResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a `PurchaseRequest`, matching the state machine of spec.md §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::Completed | RequestStatus::Failed
        )
    }
}

/// A purchase request, immutable identity + mutable lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: RequestId,
    pub employee_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: RequestStatus,
    /// Opaque refs the catalog validator interprets.
    pub product_refs: Vec<String>,
    pub justification: String,
    pub delivery_location: String,
    pub cart: Cart,
    pub approval_flow: ApprovalFlow,
    pub rejection_reason: Option<String>,
    pub order_id: Option<String>,
}

impl PurchaseRequest {
    pub fn new(
        employee_id: UserId,
        product_refs: Vec<String>,
        justification: String,
        delivery_location: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            employee_id,
            created_at,
            status: RequestStatus::Pending,
            product_refs,
            justification,
            delivery_location,
            cart: Cart::default(),
            approval_flow: ApprovalFlow::default(),
            rejection_reason: None,
            order_id: None,
        }
    }

    fn transition(&mut self, to: RequestStatus) -> WorkflowResult<()> {
        if self.status.is_terminal() {
            return Err(WorkflowError::InvalidStateTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", to),
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn reject(&mut self, reason: impl Into<String>) -> WorkflowResult<()> {
        self.transition(RequestStatus::Rejected)?;
        self.rejection_reason = Some(reason.into());
        Ok(())
    }

    pub fn approve(&mut self) -> WorkflowResult<()> {
        self.transition(RequestStatus::Approved)
    }

    pub fn complete(&mut self, order_id: impl Into<String>) -> WorkflowResult<()> {
        self.transition(RequestStatus::Completed)?;
        self.order_id = Some(order_id.into());
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> WorkflowResult<()> {
        self.transition(RequestStatus::Failed)?;
        self.rejection_reason = Some(reason.into());
        Ok(())
    }
}
