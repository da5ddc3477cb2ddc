//! `Catalog` port — product metadata lookup (spec.md §6.1, §4.2
//! `ValidateCatalogEntries`). Grounded on
//! `knhk-workflow-engine::connectors::Connector` trait shape: async,
//! fallible, a small typed error enum the step maps onto retriable/terminal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Shared error shape for port calls: transient failures the caller's retry
/// policy should absorb, versus a not-found that is a normal outcome rather
/// than an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("transient error: {0}")]
    Transient(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("terminal error: {0}")]
    Terminal(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: String,
    pub title: String,
    pub price: i64,
    pub currency: String,
    pub image_ref: Option<String>,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lookup(&self, product_ref: &str) -> Result<CatalogEntry, PortError>;
}
