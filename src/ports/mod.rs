//! External collaborators (spec.md §6.1), consumed only by steps (C2) —
//! workflow code never touches a port directly.

pub mod audit_log;
pub mod catalog;
pub mod delegation_store;
pub mod notification_sink;
pub mod purchase_gateway;
pub mod user_directory;

pub use audit_log::{AuditEvent, AuditLog};
pub use catalog::{Catalog, CatalogEntry, PortError};
pub use delegation_store::{DelegationFilter, DelegationStore};
pub use notification_sink::NotificationSink;
pub use purchase_gateway::{PurchaseGateway, PurchaseOrder, PurchaseOutcome, PurchaseStatus};
pub use user_directory::{UserDirectory, UserProfile};
