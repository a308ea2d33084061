//! Worker tasks that back the runtime orchestration.
//!
//! The simulation worker owns the session and executes commands one at a
//! time, which is what keeps turn resolution strictly sequential.

mod simulation;

pub use simulation::{Command, SimulationWorker, SpawnCommand};
