//! Cooperative cancellation for a single workflow instance. Grounded in
//! `knhk-workflow-engine::cancellation::CancellationRegistry`'s atomic flag
//! plus event log, narrowed to the single-instance case-cancellation
//! pattern this spec actually needs (spec.md §4.1 "Cancellation", §5
//! "Cancellation semantics").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    reason: Arc<parking_lot::Mutex<Option<String>>>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            reason: Arc::new(parking_lot::Mutex::new(None)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Engine-initiated cancellation request. The current suspension point
    /// wakes with a cancellation result; the workflow then runs its
    /// best-effort cleanup path (spec.md §4.1 "Cancellation").
    pub fn cancel(&self, reason: impl Into<String>) {
        *self.reason.lock() = Some(reason.into());
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Resolves once cancellation is requested; used inside `Ctx::select`
    /// alongside timers and signals.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
