//! `NotificationSink` port — fire-and-observe delivery (spec.md §6.1,
//! §4.2 `NotifyRecipient`). Failures never propagate to the workflow.

use super::catalog::PortError;
use crate::model::UserId;
use async_trait::async_trait;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, recipient_id: &UserId, payload: serde_json::Value) -> Result<(), PortError>;
}
