//! The workflow execution context (C5) — the single entry point through
//! which workflow code touches time, randomness, steps, timers, and
//! signals. Every suspension point in spec.md §4.1 item 1/§5 goes through
//! here, which is what makes deterministic replay possible: completed
//! effects are served back from `History` instead of re-executed.

use super::cancellation::CancellationToken;
use super::clock::Timebase;
use super::history::{History, HistoryEvent};
use super::signal_box::SignalBox;
use super::step::{Step, StepError};
use super::versioning;
use crate::config::RetryPolicy;
use crate::error::{WorkflowError, WorkflowResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What woke a `Ctx::select` call.
pub enum Selected<T> {
    Timer,
    Signal(String, T),
    Cancelled,
}

pub struct Ctx {
    history: History,
    timebase: Arc<dyn Timebase>,
    signals: SignalBox,
    cancellation: CancellationToken,
    instance_id: String,
}

impl Ctx {
    pub fn new(
        history: History,
        timebase: Arc<dyn Timebase>,
        signals: SignalBox,
        cancellation: CancellationToken,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            history,
            timebase,
            signals,
            cancellation,
            instance_id: instance_id.into(),
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn into_history(self) -> History {
        self.history
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Deterministic current time: recorded on first execution, replayed
    /// thereafter (spec.md §9 "Deterministic ids and timestamps").
    pub fn now(&mut self) -> DateTime<Utc> {
        if let Some(HistoryEvent::ClockRead { at, .. }) = self.history.next_replay_event() {
            return *at;
        }
        let at = self.timebase.now();
        self.history.append(HistoryEvent::ClockRead {
            seq: self.history.next_seq(),
            at,
        });
        at
    }

    /// Deterministic random id generation (spec.md §9).
    pub fn new_id(&mut self) -> Uuid {
        if let Some(HistoryEvent::IdGenerated { id, .. }) = self.history.next_replay_event() {
            return *id;
        }
        let id = Uuid::new_v4();
        self.history.append(HistoryEvent::IdGenerated {
            seq: self.history.next_seq(),
            id,
        });
        id
    }

    /// `getVersion` gate (spec.md §4.1 item 7).
    pub fn get_version(&mut self, change_id: &str, min_supported: i32, max_supported: i32) -> i32 {
        let recorded = self.history.next_replay_event().cloned();
        let (version, is_new) = versioning::resolve(recorded.as_ref(), change_id, min_supported, max_supported);
        if is_new {
            self.history.append(HistoryEvent::VersionMarker {
                seq: self.history.next_seq(),
                change_id: change_id.to_string(),
                version,
            });
        }
        version
    }

    /// Invoke a side-effect step with its retry policy. During replay,
    /// returns the recorded outcome without re-invoking the step — this is
    /// what gives "steps already completed are not re-invoked" (spec.md
    /// §4.5) and bounds `ExecutePurchase` to at most one real invocation per
    /// idempotency key across retries (spec.md §8 property 8).
    pub async fn call_step<S: Step>(
        &mut self,
        step: &S,
        input: S::Input,
        policy: &RetryPolicy,
    ) -> WorkflowResult<S::Output> {
        let name = step.name();
        if let Some(recorded) = self.history.next_replay_event() {
            return match recorded {
                HistoryEvent::StepCompleted { result, .. } => {
                    serde_json::from_value(result.clone()).map_err(WorkflowError::from)
                }
                HistoryEvent::StepFailed { message, .. } => Err(WorkflowError::StepFailed {
                    step: name.to_string(),
                    message: message.clone(),
                }),
                other => Err(WorkflowError::NonDeterminism(format!(
                    "workflow expected step {name} at this point, found {other:?}"
                ))),
            };
        }

        debug!(instance = %self.instance_id, step = name, "invoking step");
        let outcome = self.run_with_retry(step, input, policy).await;
        match outcome {
            Ok(output) => {
                let value = serde_json::to_value(&output)?;
                self.history.append(HistoryEvent::StepCompleted {
                    seq: self.history.next_seq(),
                    step: name.to_string(),
                    result: value,
                });
                Ok(output)
            }
            Err(err) => {
                self.history.append(HistoryEvent::StepFailed {
                    seq: self.history.next_seq(),
                    step: name.to_string(),
                    message: err.message.clone(),
                });
                Err(WorkflowError::StepFailed {
                    step: name.to_string(),
                    message: err.message,
                })
            }
        }
    }

    async fn run_with_retry<S: Step>(
        &self,
        step: &S,
        input: S::Input,
        policy: &RetryPolicy,
    ) -> Result<S::Output, StepError> {
        let mut delay_ms = policy.initial_interval_ms;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match step.execute(input.clone()).await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_retriable() && attempt < policy.max_attempts => {
                    warn!(step = step.name(), attempt, error = %err.message, "retrying step");
                    self.timebase
                        .sleep_until(self.timebase.now() + chrono::Duration::milliseconds(delay_ms as i64))
                        .await;
                    delay_ms = ((delay_ms as f64 * policy.backoff_coefficient) as u64)
                        .min(policy.max_interval_ms);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Durable sleep until `instant` (spec.md §4.1 item 3).
    pub async fn sleep_until(&mut self, instant: DateTime<Utc>) {
        if let Some(HistoryEvent::TimerFired { .. }) = self.history.next_replay_event() {
            return;
        }
        self.timebase.sleep_until(instant).await;
        self.history.append(HistoryEvent::TimerFired {
            seq: self.history.next_seq(),
            fire_at: instant,
        });
    }

    /// Receive the next message on a named signal channel (spec.md §4.1
    /// item 4).
    pub async fn recv_signal<T: DeserializeOwned>(&mut self, channel: &str) -> WorkflowResult<T> {
        if let Some(recorded) = self.history.next_replay_event() {
            if let HistoryEvent::SignalReceived { payload, .. } = recorded {
                return serde_json::from_value(payload.clone()).map_err(WorkflowError::from);
            }
            return Err(WorkflowError::NonDeterminism(format!(
                "expected signal on {channel}, found {recorded:?}"
            )));
        }
        let (_, payload) = self.signals.recv_any(&[channel]).await;
        let value: T = serde_json::from_value(payload.clone()).map_err(WorkflowError::from)?;
        self.history.append(HistoryEvent::SignalReceived {
            seq: self.history.next_seq(),
            channel: channel.to_string(),
            payload,
        });
        Ok(value)
    }

    /// Selector primitive (spec.md §4.1 item 6): suspend until a timer, a
    /// cancellation request, or a message on one of `channels` is ready.
    /// Whichever is ready runs to completion before the next `select`.
    pub async fn select<T: DeserializeOwned>(
        &mut self,
        deadline: DateTime<Utc>,
        channels: &[&str],
    ) -> WorkflowResult<Selected<T>> {
        if let Some(recorded) = self.history.next_replay_event().cloned() {
            return match recorded {
                HistoryEvent::TimerFired { .. } => Ok(Selected::Timer),
                HistoryEvent::SignalReceived { channel, payload, .. } => {
                    let value: T = serde_json::from_value(payload).map_err(WorkflowError::from)?;
                    Ok(Selected::Signal(channel, value))
                }
                other => Err(WorkflowError::NonDeterminism(format!(
                    "expected select outcome, found {other:?}"
                ))),
            };
        }

        let timebase = self.timebase.clone();
        let cancellation = self.cancellation.clone();
        let signals = self.signals.clone();

        tokio::select! {
            _ = timebase.sleep_until(deadline) => {
                self.history.append(HistoryEvent::TimerFired {
                    seq: self.history.next_seq(),
                    fire_at: deadline,
                });
                Ok(Selected::Timer)
            }
            _ = cancellation.cancelled() => {
                Ok(Selected::Cancelled)
            }
            (channel, payload) = signals.recv_any(channels) => {
                let value: T = serde_json::from_value(payload.clone()).map_err(WorkflowError::from)?;
                self.history.append(HistoryEvent::SignalReceived {
                    seq: self.history.next_seq(),
                    channel: channel.clone(),
                    payload,
                });
                Ok(Selected::Signal(channel, value))
            }
        }
    }
}
