//! Topic-based event bus for runtime events.
//!
//! Turn results go to [`Topic::Turn`]; degraded backends, ignored input and
//! aborted turns go to [`Topic::Status`]. Publishing never blocks and never
//! fails: events without subscribers are dropped.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{StatusEvent, TurnEvent};
