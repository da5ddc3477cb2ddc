use crate::ports::{Catalog, CatalogEntry, PortError};
use async_trait::async_trait;
use dashmap::DashMap;

/// An in-memory `Catalog` seeded by the test, with optional per-ref error
/// injection for exercising `ValidateCatalogEntries`'s retry/terminal paths.
#[derive(Default)]
pub struct InMemoryCatalog {
    entries: DashMap<String, CatalogEntry>,
    errors: DashMap<String, PortError>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, product_ref: impl Into<String>, entry: CatalogEntry) -> &Self {
        self.entries.insert(product_ref.into(), entry);
        self
    }

    /// Make the next `lookup(product_ref)` return `err` instead of a hit.
    pub fn fail_with(&self, product_ref: impl Into<String>, err: PortError) -> &Self {
        self.errors.insert(product_ref.into(), err);
        self
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn lookup(&self, product_ref: &str) -> Result<CatalogEntry, PortError> {
        if let Some(err) = self.errors.get(product_ref) {
            return Err(err.clone());
        }
        self.entries
            .get(product_ref)
            .map(|e| e.clone())
            .ok_or_else(|| PortError::NotFound(product_ref.to_string()))
    }
}
