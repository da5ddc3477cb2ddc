//! `NotifyRecipient` and `AuditDecision` (spec.md §4.2) — the two
//! fire-and-observe steps whose failures never fail the enclosing workflow.

use crate::engine::step::{Step, StepError, StepResult};
use crate::model::UserId;
use crate::ports::{AuditEvent, AuditLog, NotificationSink, PortError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRecipientInput {
    pub recipient_id: UserId,
    pub payload: serde_json::Value,
}

/// Best-effort, at-least-once delivery (spec.md §4.2, §7 "notifications are
/// never allowed to propagate"). Failures are logged and swallowed here so
/// the workflow never observes them as an error.
pub struct NotifyRecipient {
    sink: Arc<dyn NotificationSink>,
}

impl NotifyRecipient {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Step for NotifyRecipient {
    type Input = NotifyRecipientInput;
    type Output = ();

    fn name(&self) -> &'static str {
        "NotifyRecipient"
    }

    async fn execute(&self, input: NotifyRecipientInput) -> StepResult<()> {
        if let Err(err) = self.sink.send(&input.recipient_id, input.payload).await {
            warn!(recipient = %input.recipient_id, error = %err, "notification delivery failed, continuing");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditDecisionInput {
    pub subject: String,
    pub kind: String,
    pub detail: serde_json::Value,
    pub at: DateTime<Utc>,
}

/// Append-only write to the tamper-evident audit chain (spec.md §4.2).
/// Retriable on transient failure; a missing entry is surfaced as a
/// warning rather than failing the workflow (spec.md §4.5).
pub struct AuditDecision {
    log: Arc<dyn AuditLog>,
}

impl AuditDecision {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Step for AuditDecision {
    type Input = AuditDecisionInput;
    type Output = AuditEvent;

    fn name(&self) -> &'static str {
        "AuditDecision"
    }

    async fn execute(&self, input: AuditDecisionInput) -> StepResult<AuditEvent> {
        self.log
            .append(&input.subject, &input.kind, input.detail, input.at)
            .await
            .map_err(|err| match err {
                PortError::Transient(msg) => StepError::retriable(msg),
                PortError::NotFound(msg) | PortError::Terminal(msg) => StepError::terminal(msg),
            })
    }
}
