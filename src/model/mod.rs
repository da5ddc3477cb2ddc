//! Data model (C1): requests, cart, approval flow, delegation, signals.

pub mod approval_flow;
pub mod cart;
pub mod delegation;
pub mod ids;
pub mod request;
pub mod signals;

pub use approval_flow::{ApprovalFlow, Modification};
pub use cart::{Cart, CartItem, Money, ValidationResult};
pub use delegation::{Delegation, DelegationPhase};
pub use ids::{DelegationId, RequestId, UserId};
pub use request::{PurchaseRequest, RequestStatus};
pub use signals::{
    ApprovalDecision, ApprovalEnvelope, CancelDelegation, CartModification,
    DelegationModificationAction, ModifyDelegation,
};
