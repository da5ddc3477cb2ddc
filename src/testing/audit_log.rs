use crate::ports::{AuditEvent, AuditLog, PortError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

/// In-memory, hash-chained audit log. Chains are kept per `subject` so the
/// tamper-evidence check (spec.md §4.2 "Auditability") can be verified
/// independently for each request or delegation.
#[derive(Default)]
pub struct InMemoryAuditLog {
    chains: DashMap<String, Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify every entry's digest folds in the previous entry's digest
    /// correctly, returning `false` if the chain has been tampered with.
    pub fn verify_chain(&self, subject: &str) -> bool {
        let Some(chain) = self.chains.get(subject) else {
            return true;
        };
        let entries = chain.lock();
        let mut prev: Option<&str> = None;
        for entry in entries.iter() {
            let expected = AuditEvent::compute_digest(
                &entry.subject,
                &entry.kind,
                &entry.detail,
                entry.at,
                prev,
            );
            if expected != entry.digest || entry.prev_digest.as_deref() != prev {
                return false;
            }
            prev = Some(&entry.digest);
        }
        true
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(
        &self,
        subject: &str,
        kind: &str,
        detail: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<AuditEvent, PortError> {
        let chain = self.chains.entry(subject.to_string()).or_default();
        let mut entries = chain.lock();
        let prev_digest = entries.last().map(|e: &AuditEvent| e.digest.clone());
        let digest = AuditEvent::compute_digest(subject, kind, &detail, at, prev_digest.as_deref());
        let event = AuditEvent {
            subject: subject.to_string(),
            kind: kind.to_string(),
            detail,
            at,
            prev_digest,
            digest,
        };
        entries.push(event.clone());
        Ok(event)
    }

    async fn history(&self, subject: &str) -> Result<Vec<AuditEvent>, PortError> {
        Ok(self
            .chains
            .get(subject)
            .map(|chain| chain.lock().clone())
            .unwrap_or_default())
    }
}
