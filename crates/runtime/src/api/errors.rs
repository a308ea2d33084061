//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, turn resolution and enemy
//! generation so clients can bubble them up with consistent context.
//! Per-entity backend failures never appear here: they degrade the entity
//! to "stay" and are reported on the status topic instead.
use thiserror::Error;
use tokio::sync::oneshot;

use pug_core::{EntityId, ErrorSeverity, GameError, LevelError, SpawnError, TurnError};

use crate::backends::GenerationError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("enemy generation requested but no completion backend is configured")]
    GeneratorNotConfigured,

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
}

impl RuntimeError {
    /// Severity of the underlying failure; plumbing failures are fatal.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Turn(err) => err.severity(),
            Self::Spawn(err) => err.severity(),
            Self::Level(err) => err.severity(),
            Self::Generation(_) | Self::GeneratorNotConfigured => ErrorSeverity::Recoverable,
            Self::UnknownEntity(_) => ErrorSeverity::Validation,
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) | Self::WorkerJoin(_) => {
                ErrorSeverity::Fatal
            }
        }
    }
}
