use crate::env::rng::{PcgRng, RngOracle, compute_seed};
use crate::grid::{GridModel, LevelLayout};
use crate::state::{Entity, EntityId, Position};

use super::Target;

/// Read-only view handed to policies while a turn is being resolved.
///
/// Entity positions reflect every move already settled this turn, and
/// [`WorldView::is_passable`] is bound to the live occupancy grid (the
/// mover's own cell is released before it decides).
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    grid: &'a GridModel<'a>,
    entities: &'a [Entity],
    turn: u64,
    seed: u64,
}

impl<'a> WorldView<'a> {
    pub fn new(grid: &'a GridModel<'a>, entities: &'a [Entity], turn: u64, seed: u64) -> Self {
        Self {
            grid,
            entities,
            turn,
            seed,
        }
    }

    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&'a Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn player(&self) -> Option<&'a Entity> {
        self.entities.iter().find(|entity| entity.is_player())
    }

    pub fn layout(&self) -> &'a LevelLayout {
        self.grid.layout()
    }

    pub fn grid(&self) -> &'a GridModel<'a> {
        self.grid
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn is_passable(&self, position: Position, ignore_walls: bool) -> bool {
        self.grid.is_passable(position, ignore_walls)
    }

    /// Current position of a seek/flee target, if it still exists.
    pub fn target_position(&self, target: Target) -> Option<Position> {
        match target {
            Target::Player => self.player().map(|entity| entity.position),
            Target::Entity(id) => self.entity(id).map(|entity| entity.position),
        }
    }

    /// Deterministic ±1 drawn from (seed, turn, entity, purpose).
    pub fn nudge(&self, entity: EntityId, purpose: u32) -> i32 {
        PcgRng.sign(compute_seed(self.seed, self.turn, entity.0, purpose))
    }
}
