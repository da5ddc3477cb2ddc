//! Durable history persistence, so a workflow instance can resume after a
//! process restart (spec.md §4.5 "Engine crash at any point"). Grounded on
//! the teacher's `state.rs` `sled`-backed `StateStore`.

use crate::engine::History;
use crate::error::WorkflowResult;
use std::path::Path;
use std::sync::Arc;

/// Key-value store of workflow instance histories, keyed by instance id.
pub struct StateStore {
    db: sled::Db,
}

impl StateStore {
    pub fn open(path: impl AsRef<Path>) -> WorkflowResult<Arc<Self>> {
        let db = sled::open(path)?;
        Ok(Arc::new(Self { db }))
    }

    /// An ephemeral, in-memory store for tests and the CLI demo driver.
    pub fn temporary() -> WorkflowResult<Arc<Self>> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Arc::new(Self { db }))
    }

    pub fn save_history(&self, instance_id: &str, history: &History) -> WorkflowResult<()> {
        let bytes = serde_json::to_vec(history)?;
        self.db.insert(instance_id.as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load_history(&self, instance_id: &str) -> WorkflowResult<Option<History>> {
        match self.db.get(instance_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}
