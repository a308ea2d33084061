use std::fmt;

use crate::error::{ErrorSeverity, GameError};
use crate::state::{EntityId, Position};

/// Where the turn state machine currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnPhase {
    #[default]
    AwaitingInput,
    ResolvingPlayer,
    ResolvingEnemies,
    Committed,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::AwaitingInput => "awaiting_input",
            TurnPhase::ResolvingPlayer => "resolving_player",
            TurnPhase::ResolvingEnemies => "resolving_enemies",
            TurnPhase::Committed => "committed",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural failures that abort a whole turn.
///
/// A turn that fails with one of these leaves the committed state untouched
/// and the phase back at [`TurnPhase::AwaitingInput`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnError {
    #[error("input rejected: turn is {phase}")]
    NotAwaitingInput { phase: TurnPhase },

    #[error("no player entity")]
    MissingPlayer,

    #[error("{count} player entities, expected exactly one")]
    MultiplePlayers { count: usize },

    #[error("entity {entity} has an invalid committed position {position}")]
    CorruptState { entity: EntityId, position: Position },
}

impl GameError for TurnError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotAwaitingInput { .. } => ErrorSeverity::Recoverable,
            Self::MissingPlayer | Self::MultiplePlayers { .. } | Self::CorruptState { .. } => {
                ErrorSeverity::Fatal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAwaitingInput { .. } => "TURN_NOT_AWAITING_INPUT",
            Self::MissingPlayer => "TURN_MISSING_PLAYER",
            Self::MultiplePlayers { .. } => "TURN_MULTIPLE_PLAYERS",
            Self::CorruptState { .. } => "TURN_CORRUPT_STATE",
        }
    }
}
