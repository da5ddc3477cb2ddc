//! `AuditLog` port — durable, append-only, tamper-evident (spec.md §6.1,
//! §4.2 `AuditDecision`). Entries are hash-chained with `blake3`: each
//! entry's digest folds in the previous entry's digest, so any append-log
//! implementation can expose the same "was anything rewritten" check
//! without an external ledger. Grounded in the teacher pack's hash-chained
//! receipts concern, inlined here rather than pulled in as a path
//! dependency (see DESIGN.md).

use super::catalog::PortError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub subject: String,
    pub kind: String,
    pub detail: serde_json::Value,
    pub at: DateTime<Utc>,
    /// Hex-encoded blake3 digest of the previous entry, `None` for the
    /// first entry in the chain.
    pub prev_digest: Option<String>,
    /// Hex-encoded blake3 digest of this entry (subject, kind, detail, at,
    /// prev_digest), computed by `append`.
    pub digest: String,
}

impl AuditEvent {
    /// Compute the digest of `(subject, kind, detail, at, prev_digest)`.
    /// Exposed so implementations and tests can independently verify a
    /// chain without re-deriving the hashing scheme.
    pub fn compute_digest(
        subject: &str,
        kind: &str,
        detail: &serde_json::Value,
        at: DateTime<Utc>,
        prev_digest: Option<&str>,
    ) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(subject.as_bytes());
        hasher.update(kind.as_bytes());
        hasher.update(detail.to_string().as_bytes());
        hasher.update(at.to_rfc3339().as_bytes());
        hasher.update(prev_digest.unwrap_or("").as_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append an event to the chain and return the populated entry
    /// (including the computed digest). Retriable on transient failure;
    /// a missing audit entry is not fatal to the business outcome
    /// (spec.md §4.2, §4.5).
    async fn append(
        &self,
        subject: &str,
        kind: &str,
        detail: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<AuditEvent, PortError>;

    /// Every entry recorded for `subject`, oldest first.
    async fn history(&self, subject: &str) -> Result<Vec<AuditEvent>, PortError>;
}
