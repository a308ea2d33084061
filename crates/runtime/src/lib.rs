//! Async shell around `pug-core`.
//!
//! The core resolves turns synchronously; this crate owns everything that
//! waits: external movement backends (completion models, embedded scripts,
//! host closures), bounded timeouts, the single simulation worker that keeps
//! turns strictly sequential, and the event bus the presentation layer
//! listens to.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator, builder and configuration
//! - [`api`] exposes the types downstream clients interact with
//! - [`backends`] provides built-in external backends and reply coercion
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`resolver`] drives a turn step by step, awaiting backends in order
//! - [`session`] owns one game's state, history and backends
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod backends;
pub mod events;
pub mod resolver;
pub mod runtime;
pub mod session;

mod workers;

pub use api::{
    Backend, BackendError, BackendRegistry, BackendReply, BatchPolicyBackend, BatchRequest,
    DecisionRequest, InputGate, InputOutcome, PolicyBackend, Result, RuntimeError, RuntimeHandle,
};
pub use backends::{
    CompletionClient, EnemyGenerator, FnPolicy, FormationPlanner, GenerationError, GridPlanner,
    LlmNavigator, Persona, ScriptError, ScriptPolicy,
};
pub use events::{Event, EventBus, StatusEvent, Topic, TurnEvent};
pub use resolver::{ResolveContext, resolve_turn};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use session::GameSession;
