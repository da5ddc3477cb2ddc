//! Named, workflow-scoped FIFO signal channels (spec.md §4.1 item 4).
//! Messages persist until consumed; reception is a suspension point.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared, cloneable handle callers use to post signals into a running
/// workflow instance, and the engine uses to deliver them.
#[derive(Clone)]
pub struct SignalBox {
    queues: Arc<Mutex<HashMap<String, VecDeque<serde_json::Value>>>>,
    notify: Arc<Notify>,
}

impl SignalBox {
    pub fn new() -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Enqueue a signal payload on `channel`. Never blocks; the message
    /// waits until the workflow reaches a suspension point that consumes it.
    pub fn post(&self, channel: &str, payload: serde_json::Value) {
        self.queues
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push_back(payload);
        self.notify.notify_waiters();
    }

    fn try_take_any(&self, channels: &[&str]) -> Option<(String, serde_json::Value)> {
        let mut queues = self.queues.lock();
        for channel in channels {
            if let Some(queue) = queues.get_mut(*channel) {
                if let Some(payload) = queue.pop_front() {
                    return Some((channel.to_string(), payload));
                }
            }
        }
        None
    }

    /// Suspend until a message is available on any of `channels`, returning
    /// the channel name it arrived on and the raw payload. FIFO is
    /// guaranteed per channel; across channels the engine returns whichever
    /// became ready first (spec.md §5 "Ordering guarantees").
    pub async fn recv_any(&self, channels: &[&str]) -> (String, serde_json::Value) {
        loop {
            if let Some(hit) = self.try_take_any(channels) {
                return hit;
            }
            let notified = self.notify.notified();
            if let Some(hit) = self.try_take_any(channels) {
                return hit;
            }
            notified.await;
        }
    }
}

impl Default for SignalBox {
    fn default() -> Self {
        Self::new()
    }
}
