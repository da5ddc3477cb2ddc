//! Append-only workflow history — the substrate deterministic replay is
//! built on (spec.md §4.1 item 1, item 7; §8 property 9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded non-deterministic effect. A workflow instance's history is
/// a `Vec<HistoryEvent>`; replaying it in order and feeding each event back
/// to the workflow code in place of re-executing the effect is what gives
/// "steps already completed are not re-invoked" (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HistoryEvent {
    StepCompleted {
        seq: u64,
        step: String,
        result: serde_json::Value,
    },
    StepFailed {
        seq: u64,
        step: String,
        message: String,
    },
    TimerFired {
        seq: u64,
        fire_at: DateTime<Utc>,
    },
    SignalReceived {
        seq: u64,
        channel: String,
        payload: serde_json::Value,
    },
    VersionMarker {
        seq: u64,
        change_id: String,
        version: i32,
    },
    IdGenerated {
        seq: u64,
        id: uuid::Uuid,
    },
    ClockRead {
        seq: u64,
        at: DateTime<Utc>,
    },
}

impl HistoryEvent {
    pub fn seq(&self) -> u64 {
        match self {
            HistoryEvent::StepCompleted { seq, .. }
            | HistoryEvent::StepFailed { seq, .. }
            | HistoryEvent::TimerFired { seq, .. }
            | HistoryEvent::SignalReceived { seq, .. }
            | HistoryEvent::VersionMarker { seq, .. }
            | HistoryEvent::IdGenerated { seq, .. }
            | HistoryEvent::ClockRead { seq, .. } => *seq,
        }
    }
}

/// The recorded history for one workflow instance, plus a replay cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    events: Vec<HistoryEvent>,
    /// Index of the next event to hand out during replay. Once the cursor
    /// reaches `events.len()`, the context switches from replaying to
    /// executing live and starts appending.
    #[serde(skip)]
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<HistoryEvent>) -> Self {
        Self { events, cursor: 0 }
    }

    pub fn is_replaying(&self) -> bool {
        self.cursor < self.events.len()
    }

    pub fn next_seq(&self) -> u64 {
        self.events.len() as u64
    }

    /// Pop the next event off the replay cursor, if there is one.
    pub fn next_replay_event(&mut self) -> Option<&HistoryEvent> {
        if self.cursor < self.events.len() {
            let ev = &self.events[self.cursor];
            self.cursor += 1;
            Some(ev)
        } else {
            None
        }
    }

    /// Append a freshly-produced event (live execution).
    pub fn append(&mut self, event: HistoryEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }
}
