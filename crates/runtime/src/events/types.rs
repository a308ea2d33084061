use serde::{Deserialize, Serialize};

use pug_core::{EntityId, Position, RenderSnapshot, TurnSummary};

/// Events on [`super::Topic::Turn`].
///
/// Every event that changes the board carries the snapshot to draw next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TurnEvent {
    Committed {
        summary: TurnSummary,
        snapshot: RenderSnapshot,
    },
    Rewound {
        snapshot: RenderSnapshot,
    },
    Reset {
        snapshot: RenderSnapshot,
    },
    Spawned {
        id: EntityId,
        name: String,
        position: Position,
        snapshot: RenderSnapshot,
    },
    Despawned {
        id: EntityId,
        snapshot: RenderSnapshot,
    },
    /// The runtime accepts input again.
    AwaitingInput {
        turn: u64,
    },
}

/// Events on [`super::Topic::Status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatusEvent {
    /// A backend failed or timed out; the entity stayed this turn.
    BackendUnavailable {
        entity: EntityId,
        backend: String,
        reason: String,
    },
    /// A backend answered with something that could not be read as a move.
    MalformedReply {
        entity: EntityId,
        backend: String,
        reason: String,
    },
    /// The turn was abandoned before commit; nothing changed.
    TurnAborted {
        code: String,
        error: String,
    },
    /// Input arrived while a turn was still resolving.
    InputIgnored,
    GenerationFailed {
        description: String,
        reason: String,
    },
}
