//! Engine contract (C5): deterministic replay, steps, timers, signals,
//! queries, selector, identity/versioning (spec.md §4.1).

pub mod cancellation;
pub mod clock;
pub mod context;
pub mod history;
pub mod signal_box;
pub mod step;
pub mod versioning;

pub use cancellation::CancellationToken;
pub use clock::{SimulatedTimebase, SystemTimebase, Timebase};
pub use context::{Ctx, Selected};
pub use history::{History, HistoryEvent};
pub use signal_box::SignalBox;
pub use step::{ErrorKind, Step, StepError, StepResult};
