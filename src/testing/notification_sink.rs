use crate::model::UserId;
use crate::ports::{NotificationSink, PortError};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Records every delivered notification for assertions; never fails unless
/// told to, since production `NotifyRecipient` already swallows errors.
#[derive(Default)]
pub struct InMemoryNotificationSink {
    sent: Mutex<Vec<(UserId, serde_json::Value)>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(UserId, serde_json::Value)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, recipient: &UserId) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| id == recipient)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn send(&self, recipient_id: &UserId, payload: serde_json::Value) -> Result<(), PortError> {
        self.sent.lock().push((recipient_id.clone(), payload));
        Ok(())
    }
}
