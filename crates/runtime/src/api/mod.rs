//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration, workers, or backends.

pub mod backend;
pub mod errors;
pub mod handle;
pub mod registry;

pub use backend::{
    BackendError, BackendReply, BatchMember, BatchPolicyBackend, BatchRequest, DecisionRequest,
    Neighbor, PolicyBackend, render_text_grid, token_for,
};
pub use errors::{Result, RuntimeError};
pub use handle::{InputGate, InputOutcome, RuntimeHandle};
pub use registry::{Backend, BackendRegistry};
