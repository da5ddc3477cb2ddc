//! `ValidateCatalogEntries` (spec.md §4.2).

use crate::engine::step::{Step, StepError, StepResult};
use crate::model::{CartItem, ValidationResult};
use crate::ports::{Catalog, PortError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Validates and prices a submitted list of product refs against the
/// `Catalog` port. Block-lists are fixed at construction time (they come
/// from `EngineConfig`, not from the per-call input).
pub struct ValidateCatalogEntries {
    catalog: Arc<dyn Catalog>,
    block_terms: Vec<String>,
    block_ids: Vec<String>,
}

impl ValidateCatalogEntries {
    pub fn new(catalog: Arc<dyn Catalog>, block_terms: Vec<String>, block_ids: Vec<String>) -> Self {
        Self {
            catalog,
            block_terms: block_terms.into_iter().map(|t| t.to_lowercase()).collect(),
            block_ids,
        }
    }

    fn is_prohibited(&self, title: &str, product_id: &str) -> bool {
        let title_lower = title.to_lowercase();
        self.block_terms.iter().any(|term| title_lower.contains(term.as_str()))
            || self.block_ids.iter().any(|id| id == product_id)
    }
}

#[async_trait]
impl Step for ValidateCatalogEntries {
    type Input = Vec<String>;
    type Output = ValidationResult;

    fn name(&self) -> &'static str {
        "ValidateCatalogEntries"
    }

    async fn execute(&self, refs: Vec<String>) -> StepResult<ValidationResult> {
        let mut result = ValidationResult::default();
        let mut seen_product_ids: HashSet<String> = HashSet::new();
        let mut common_currency: Option<String> = None;

        for product_ref in refs {
            if product_ref.trim().is_empty() {
                result.invalid.push(CartItem {
                    product_ref,
                    product_id: None,
                    title: None,
                    price: 0,
                    quantity: 1,
                    valid: false,
                    prohibited: false,
                    error_message: Some("empty product ref".to_string()),
                });
                continue;
            }

            match self.catalog.lookup(&product_ref).await {
                Ok(entry) => {
                    if seen_product_ids.contains(&entry.product_id) {
                        result.duplicated.push(CartItem {
                            product_ref,
                            product_id: Some(entry.product_id),
                            title: Some(entry.title),
                            price: entry.price,
                            quantity: 1,
                            valid: false,
                            prohibited: false,
                            error_message: Some("duplicate product".to_string()),
                        });
                        continue;
                    }
                    seen_product_ids.insert(entry.product_id.clone());

                    if self.is_prohibited(&entry.title, &entry.product_id) {
                        result.prohibited.push(CartItem {
                            product_ref,
                            product_id: Some(entry.product_id),
                            title: Some(entry.title),
                            price: entry.price,
                            quantity: 1,
                            valid: false,
                            prohibited: true,
                            error_message: Some("prohibited item".to_string()),
                        });
                        continue;
                    }

                    match &common_currency {
                        None => common_currency = Some(entry.currency.clone()),
                        Some(currency) if currency != &entry.currency => {
                            return Err(StepError::terminal(format!(
                                "mixed currencies in cart: {currency} vs {}",
                                entry.currency
                            )));
                        }
                        Some(_) => {}
                    }

                    result.valid.push(CartItem {
                        product_ref,
                        product_id: Some(entry.product_id),
                        title: Some(entry.title),
                        price: entry.price,
                        quantity: 1,
                        valid: true,
                        prohibited: false,
                        error_message: None,
                    });
                }
                Err(PortError::NotFound(msg)) => {
                    result.invalid.push(CartItem {
                        product_ref,
                        product_id: None,
                        title: None,
                        price: 0,
                        quantity: 1,
                        valid: false,
                        prohibited: false,
                        error_message: Some(msg),
                    });
                }
                Err(PortError::Transient(msg)) => return Err(StepError::retriable(msg)),
                Err(PortError::Terminal(msg)) => return Err(StepError::terminal(msg)),
            }
        }

        if !result.prohibited.is_empty() {
            result.warnings.push(format!(
                "{} item(s) removed as prohibited",
                result.prohibited.len()
            ));
        }
        if !result.duplicated.is_empty() {
            result.warnings.push(format!(
                "{} duplicate item(s) ignored",
                result.duplicated.len()
            ));
        }
        if !result.invalid.is_empty() {
            result.warnings.push(format!(
                "{} item(s) could not be resolved",
                result.invalid.len()
            ));
        }

        result.total_amount = result.valid.iter().map(CartItem::subtotal).sum();
        result.currency = common_currency.unwrap_or_default();
        Ok(result)
    }
}
