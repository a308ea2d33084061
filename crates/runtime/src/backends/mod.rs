//! Built-in external backends and reply coercion.
//!
//! - [`FnPolicy`]: a host closure.
//! - [`ScriptPolicy`]: an embedded Rhai script under an operation budget.
//! - [`LlmNavigator`]: a completion model asked for a direction word.
//! - [`FormationPlanner`] and [`GridPlanner`]: batched completion backends.
//! - [`EnemyGenerator`]: turns a description into a [`ScriptPolicy`].

pub mod coerce;
mod errors;
mod function;
mod generator;
mod llm;
mod script;

pub use coerce::{coerce_batch, coerce_reply};
pub use errors::{CoerceError, GenerationError, ScriptError};
pub use function::FnPolicy;
pub use generator::{DEFAULT_GENERATION_TIMEOUT, EnemyGenerator, GeneratedEnemy};
pub use llm::{CompletionClient, FormationPlanner, GridPlanner, LlmNavigator, Persona};
pub use script::{DEFAULT_MAX_OPERATIONS, ScriptPolicy};
