//! Authoritative game state representation.
//!
//! [`GameState`] owns the committed entity list, the turn counter and the
//! turn phase. The resolver in [`crate::engine`] is the only code that moves
//! entities; this module only handles creation, removal and restoration.
pub mod types;

pub use types::{Direction, Entity, EntityId, EntityKind, Offset, Position};

use crate::engine::TurnPhase;
use crate::env::{LevelBlueprint, SpawnSpec};
use crate::error::{ErrorSeverity, GameError};
use crate::grid::LevelLayout;
use crate::history::HistoryEntry;

/// Errors raised when placing a new entity.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("spawn position {position} is outside the grid")]
    OutOfBounds { position: Position },

    #[error("spawn position {position} is a wall")]
    Blocked { position: Position },

    #[error("spawn position {position} is occupied by {occupant}")]
    Occupied {
        position: Position,
        occupant: EntityId,
    },

    #[error("a player entity already exists ({existing})")]
    DuplicatePlayer { existing: EntityId },

    #[error("no free cell left on the grid")]
    NoFreeCell,
}

impl GameError for SpawnError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfBounds { .. } | Self::DuplicatePlayer { .. } => ErrorSeverity::Validation,
            Self::Blocked { .. } | Self::Occupied { .. } | Self::NoFreeCell => {
                ErrorSeverity::Recoverable
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "SPAWN_OUT_OF_BOUNDS",
            Self::Blocked { .. } => "SPAWN_BLOCKED",
            Self::Occupied { .. } => "SPAWN_OCCUPIED",
            Self::DuplicatePlayer { .. } => "SPAWN_DUPLICATE_PLAYER",
            Self::NoFreeCell => "SPAWN_NO_FREE_CELL",
        }
    }
}

/// Canonical snapshot of the committed game state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameState {
    /// Seed for every pseudo-random decision (flee nudges).
    ///
    /// Set once at game initialization and never modified.
    pub seed: u64,

    /// Number of committed turns.
    pub turn: u64,

    /// Where the turn state machine currently is.
    pub phase: TurnPhase,

    entities: Vec<Entity>,

    /// Sequential id allocator. Never reused, not even after undo.
    next_entity_id: u32,

    /// Sequential movement-order allocator, same rules as ids.
    next_movement_order: u32,
}

impl GameState {
    /// Creates an empty state awaiting input.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            turn: 0,
            phase: TurnPhase::AwaitingInput,
            entities: Vec::new(),
            next_entity_id: EntityId::PLAYER.0,
            next_movement_order: 0,
        }
    }

    /// Spawns every entity of a blueprint in list order.
    pub fn from_blueprint(blueprint: &LevelBlueprint, seed: u64) -> Result<Self, SpawnError> {
        let mut state = Self::new(seed);
        for spec in &blueprint.spawns {
            state.spawn(&blueprint.layout, spec.clone())?;
        }
        Ok(state)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    /// The first player entity, if any.
    pub fn player(&self) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.is_player())
    }

    pub fn occupant_at(&self, position: Position) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.position == position)
    }

    /// True when a mover could be placed at `position` right now.
    pub fn is_free(&self, layout: &LevelLayout, position: Position, flying: bool) -> bool {
        layout.contains(position)
            && (flying || !layout.is_wall(position))
            && self.occupant_at(position).is_none()
    }

    /// Closest free cell to `preferred`, searching Chebyshev rings outward
    /// and row-major within a ring.
    pub fn nearest_free(
        &self,
        layout: &LevelLayout,
        preferred: Position,
        flying: bool,
    ) -> Option<Position> {
        let preferred = layout.clamp(preferred);
        let max_radius = layout.width().max(layout.height()) as i32;
        for radius in 0..=max_radius {
            for y in (preferred.y - radius)..=(preferred.y + radius) {
                for x in (preferred.x - radius)..=(preferred.x + radius) {
                    let candidate = Position::new(x, y);
                    if preferred.chebyshev(candidate) == radius as u32
                        && self.is_free(layout, candidate, flying)
                    {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Places a new entity and assigns its id and movement order.
    pub fn spawn(&mut self, layout: &LevelLayout, spec: SpawnSpec) -> Result<EntityId, SpawnError> {
        let SpawnSpec {
            name,
            position,
            policy,
        } = spec;

        if !layout.contains(position) {
            return Err(SpawnError::OutOfBounds { position });
        }
        if !policy.is_flying() && layout.is_wall(position) {
            return Err(SpawnError::Blocked { position });
        }
        if let Some(occupant) = self.occupant_at(position) {
            return Err(SpawnError::Occupied {
                position,
                occupant: occupant.id,
            });
        }
        if policy.kind() == EntityKind::Player
            && let Some(existing) = self.player()
        {
            return Err(SpawnError::DuplicatePlayer {
                existing: existing.id,
            });
        }

        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        let movement_order = self.next_movement_order;
        self.next_movement_order += 1;

        self.entities
            .push(Entity::new(id, name, position, movement_order, policy));
        Ok(id)
    }

    /// Removes an entity. Removing the player is allowed; the next turn will
    /// then refuse to resolve.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|entity| entity.id == id)?;
        Some(self.entities.remove(index))
    }

    /// Rolls the committed state back to a history entry.
    pub fn restore(&mut self, entry: HistoryEntry) {
        self.entities = entry.entities;
        self.turn = entry.turn;
        self.phase = TurnPhase::AwaitingInput;
    }

    pub(crate) fn commit_entities(&mut self, entities: Vec<Entity>) {
        self.entities = entities;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MovementPolicy;

    fn layout() -> LevelLayout {
        LevelLayout::open(5, 5)
            .unwrap()
            .with_walls(&[Position::new(2, 2)])
    }

    #[test]
    fn ids_and_orders_are_monotonic() {
        let layout = layout();
        let mut state = GameState::new(7);
        let a = state
            .spawn(&layout, SpawnSpec::player(Position::new(0, 0)))
            .unwrap();
        let b = state
            .spawn(&layout, SpawnSpec::roach(Position::new(4, 4)))
            .unwrap();
        state.despawn(b);
        let c = state
            .spawn(&layout, SpawnSpec::roach(Position::new(4, 4)))
            .unwrap();

        assert_eq!(a, EntityId::PLAYER);
        assert!(c.0 > b.0);
        assert_eq!(state.entity(c).unwrap().movement_order, 2);
    }

    #[test]
    fn spawn_rejects_walls_occupied_cells_and_second_player() {
        let layout = layout();
        let mut state = GameState::new(0);
        state
            .spawn(&layout, SpawnSpec::player(Position::new(0, 0)))
            .unwrap();

        assert!(matches!(
            state.spawn(&layout, SpawnSpec::roach(Position::new(2, 2))),
            Err(SpawnError::Blocked { .. })
        ));
        assert!(matches!(
            state.spawn(&layout, SpawnSpec::roach(Position::new(0, 0))),
            Err(SpawnError::Occupied { .. })
        ));
        assert!(matches!(
            state.spawn(&layout, SpawnSpec::roach(Position::new(9, 0))),
            Err(SpawnError::OutOfBounds { .. })
        ));
        assert!(matches!(
            state.spawn(&layout, SpawnSpec::player(Position::new(1, 0))),
            Err(SpawnError::DuplicatePlayer { .. })
        ));
    }

    #[test]
    fn flying_spawns_may_sit_on_walls() {
        let layout = layout();
        let mut state = GameState::new(0);
        let spec = SpawnSpec::new(
            "moth",
            Position::new(2, 2),
            MovementPolicy::seek().flying(),
        );
        assert!(state.spawn(&layout, spec).is_ok());
    }

    #[test]
    fn nearest_free_walks_outward() {
        let layout = layout();
        let mut state = GameState::new(0);
        state
            .spawn(&layout, SpawnSpec::player(Position::new(3, 3)))
            .unwrap();

        assert_eq!(
            state.nearest_free(&layout, Position::new(3, 3), false),
            Some(Position::new(3, 2))
        );
        assert_eq!(
            state.nearest_free(&layout, Position::new(2, 2), false),
            Some(Position::new(1, 1))
        );
    }
}
