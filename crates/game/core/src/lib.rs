//! Deterministic turn rules for the PuG grid game.
//!
//! `pug-core` owns the grid model, the movement policies, the turn state
//! machine and the undo ledger. It performs no I/O and never awaits: the
//! runtime drives a [`PendingTurn`] step by step when external backends are
//! involved, and [`TurnEngine`] drives it synchronously otherwise. Every
//! committed position goes through [`policy::validate`].
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod grid;
pub mod history;
pub mod policy;
pub mod snapshot;
pub mod state;

pub use config::GameConfig;
pub use engine::{
    EnemyTurn, MoveOutcome, PendingTurn, TurnEngine, TurnError, TurnPhase, TurnSummary,
};
pub use env::{
    LevelBlueprint, LevelKind, SpawnRequest, SpawnSpec, classify_spawn_prompt, extract_enemy_name,
};
pub use error::{ErrorSeverity, GameError};
pub use grid::{GridModel, Layer, LevelError, LevelLayout, Occupant, OccupancyGrid};
pub use history::{HistoryEntry, HistoryLedger};
pub use policy::{
    AxisPreference, BackendId, ExternalPolicy, FleePolicy, MoveSet, MovementPolicy, PlayerInput,
    Proposal, Rejection, SeekPolicy, Target, WorldView,
};
pub use snapshot::RenderSnapshot;
pub use state::{Direction, Entity, EntityId, EntityKind, GameState, Offset, Position, SpawnError};
