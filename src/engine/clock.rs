//! Abstract time source for workflow code. Workflows must never call
//! `Utc::now()` or `tokio::time::sleep` directly — all non-determinism comes
//! through here so replay can reproduce it (spec.md §4.1 item 1, §9
//! "Deterministic ids and timestamps"). Modeled on
//! `knhk-workflow-engine::services::timer::TimerService`'s use of a
//! `Timebase` abstraction (`now_wall()`, `sleep()`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Duration;

#[async_trait]
pub trait Timebase: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep_until(&self, instant: DateTime<Utc>);
}

/// Real wall-clock time, used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimebase;

#[async_trait]
impl Timebase for SystemTimebase {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, instant: DateTime<Utc>) {
        let now = Utc::now();
        if instant <= now {
            return;
        }
        let remaining = (instant - now)
            .to_std()
            .unwrap_or(Duration::from_millis(0));
        tokio::time::sleep(remaining).await;
    }
}

/// A manually-advanced clock for tests, so the 7-day approval window and
/// multi-day delegation windows of spec.md §8 can be exercised without a
/// real sleep. Grounded in the `testing` feature the teacher crate carries
/// (there backed by `chicago-tdd-tools`, here a plain in-crate fake).
pub struct SimulatedTimebase {
    inner: parking_lot::Mutex<DateTime<Utc>>,
    notify: Arc<Notify>,
}

impl SimulatedTimebase {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: parking_lot::Mutex::new(start),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Advance the clock and wake any waiters whose deadline has passed.
    pub fn advance(&self, delta: chrono::Duration) {
        {
            let mut now = self.inner.lock();
            *now += delta;
        }
        self.notify.notify_waiters();
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.inner.lock() = instant;
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl Timebase for SimulatedTimebase {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock()
    }

    async fn sleep_until(&self, instant: DateTime<Utc>) {
        loop {
            if self.now() >= instant {
                return;
            }
            let notified = self.notify.notified();
            if self.now() >= instant {
                return;
            }
            notified.await;
        }
    }
}
