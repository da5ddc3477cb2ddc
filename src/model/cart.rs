//! Cart, cart items and catalog-validation results (spec.md §3).

use serde::{Deserialize, Serialize};

/// Monetary amount in minor currency units (cents), avoiding floating point
/// for the invariant in §3 ("`totalAmount` equals the sum over items of
/// `price × quantity`").
pub type Money = i64;

/// A single line item in a cart, after catalog validation has run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    /// The opaque ref as submitted by the requester.
    pub product_ref: String,
    /// The catalog-resolved product id, if validation succeeded.
    pub product_id: Option<String>,
    pub title: Option<String>,
    pub price: Money,
    pub quantity: u32,
    pub valid: bool,
    pub prohibited: bool,
    pub error_message: Option<String>,
}

impl CartItem {
    pub fn subtotal(&self) -> Money {
        self.price * self.quantity as Money
    }
}

/// The cart embedded in a `PurchaseRequest`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total_amount: Money,
    pub currency: String,
}

impl Cart {
    /// Checks the §3 cart invariant: `total_amount` equals the sum over
    /// valid, non-prohibited items of `price × quantity`.
    pub fn total_amount_is_consistent(&self) -> bool {
        let expected: Money = self
            .items
            .iter()
            .filter(|item| item.valid && !item.prohibited)
            .map(CartItem::subtotal)
            .sum();
        expected == self.total_amount
    }
}

/// Outcome of `ValidateCatalogEntries` (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub valid: Vec<CartItem>,
    pub invalid: Vec<CartItem>,
    pub prohibited: Vec<CartItem>,
    pub duplicated: Vec<CartItem>,
    pub total_amount: Money,
    pub currency: String,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Merge valid and invalid items in the order the step produced them,
    /// preserving input-order partitioning (spec.md §4.3 step 2). Prohibited
    /// and duplicated items are recorded as warnings but do not appear in
    /// the merged cart's item list — they never had a chance to become part
    /// of what gets purchased.
    pub fn into_cart(self) -> Cart {
        let mut items = self.valid;
        items.extend(self.invalid);
        Cart {
            items,
            total_amount: self.total_amount,
            currency: self.currency,
        }
    }
}
