//! `UserDirectory` port — role/limit/org lookups (spec.md §6.1). Role-based
//! policy lives behind this port rather than in workflow code (spec.md §9
//! "Polymorphic approver list").

use super::catalog::PortError;
use crate::model::{Money, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub role: String,
    pub manager_id: Option<UserId>,
    pub supervisor_id: Option<UserId>,
    pub approval_limit: Money,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, PortError>;
    async fn subordinates_of(&self, id: &UserId) -> Result<Vec<UserId>, PortError>;
    async fn is_active_employee(&self, id: &UserId) -> Result<bool, PortError>;
}
