use crate::model::{Delegation, DelegationId, DelegationPhase, Money};
use crate::ports::{DelegationFilter, DelegationStore, PortError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// In-memory `DelegationStore`. Every method mutates the stored record
/// synchronously, matching the serialization guarantee the approval and
/// delegation workflows both depend on (spec.md §9 "Global mutable state").
#[derive(Default)]
pub struct InMemoryDelegationStore {
    delegations: DashMap<DelegationId, Delegation>,
}

impl InMemoryDelegationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DelegationStore for InMemoryDelegationStore {
    async fn get(&self, id: &DelegationId) -> Result<Delegation, PortError> {
        self.delegations
            .get(id)
            .map(|d| d.clone())
            .ok_or_else(|| PortError::NotFound(id.to_string()))
    }

    async fn list(&self, filter: &DelegationFilter) -> Result<Vec<Delegation>, PortError> {
        Ok(self
            .delegations
            .iter()
            .map(|entry| entry.clone())
            .filter(|d| filter.from_user_id.as_ref().map_or(true, |u| u == &d.from_user_id))
            .filter(|d| !filter.active_only || d.phase == DelegationPhase::Active)
            .collect())
    }

    async fn put(&self, delegation: Delegation) -> Result<(), PortError> {
        self.delegations.insert(delegation.id, delegation);
        Ok(())
    }

    async fn set_phase(&self, id: &DelegationId, phase: DelegationPhase, now: DateTime<Utc>) -> Result<(), PortError> {
        let mut entry = self
            .delegations
            .get_mut(id)
            .ok_or_else(|| PortError::NotFound(id.to_string()))?;
        let result = match phase {
            DelegationPhase::Active => entry.activate(now),
            DelegationPhase::Expired => entry.expire(now),
            DelegationPhase::Cancelled => entry.cancel(now),
            DelegationPhase::Invalid => entry.invalidate(now),
            other => return Err(PortError::Terminal(format!("cannot set_phase to {other:?} directly"))),
        };
        result.map_err(|e| PortError::Terminal(e.to_string()))
    }

    async fn set_end_at(&self, id: &DelegationId, new_end_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), PortError> {
        let mut entry = self
            .delegations
            .get_mut(id)
            .ok_or_else(|| PortError::NotFound(id.to_string()))?;
        entry.extend(new_end_at, now);
        Ok(())
    }

    async fn set_max_amount(&self, id: &DelegationId, new_max_amount: Money, now: DateTime<Utc>) -> Result<(), PortError> {
        let mut entry = self
            .delegations
            .get_mut(id)
            .ok_or_else(|| PortError::NotFound(id.to_string()))?;
        entry.set_max_amount(new_max_amount, now);
        Ok(())
    }

    async fn increment_used(
        &self,
        id: &DelegationId,
        amount: Money,
        dedup_key: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PortError> {
        let mut entry = self
            .delegations
            .get_mut(id)
            .ok_or_else(|| PortError::NotFound(id.to_string()))?;
        entry.record_usage(dedup_key, amount, now);
        Ok(())
    }
}
