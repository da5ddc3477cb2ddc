use crate::model::UserId;
use crate::ports::{PortError, UserDirectory, UserProfile};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, UserProfile>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, profile: UserProfile) -> &Self {
        self.users.insert(profile.id.clone(), profile);
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, PortError> {
        self.users
            .get(id)
            .map(|u| u.clone())
            .ok_or_else(|| PortError::NotFound(id.to_string()))
    }

    async fn subordinates_of(&self, id: &UserId) -> Result<Vec<UserId>, PortError> {
        Ok(self
            .users
            .iter()
            .filter(|entry| entry.manager_id.as_ref() == Some(id) || entry.supervisor_id.as_ref() == Some(id))
            .map(|entry| entry.id.clone())
            .collect())
    }

    async fn is_active_employee(&self, id: &UserId) -> Result<bool, PortError> {
        Ok(self.users.contains_key(id))
    }
}
