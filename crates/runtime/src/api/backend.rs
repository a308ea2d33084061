//! Contract between the resolver and external movement backends.
//!
//! Backends never see live game objects. The resolver serializes what an
//! entity can observe into a [`DecisionRequest`] (or a [`BatchRequest`] for
//! batched backends), and whatever comes back is coerced into a single
//! proposal and validated by the core like any built-in move.
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pug_core::{
    Direction, Entity, EntityId, EntityKind, Offset, Position, Proposal, WorldView,
};

use crate::backends::ScriptError;

/// Another entity as seen from the deciding one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub position: Position,
    /// Offset from the deciding entity to this one.
    pub offset: Offset,
}

/// Everything a per-entity backend may look at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub turn: u64,
    pub entity: EntityId,
    pub name: String,
    pub position: Position,
    pub width: u32,
    pub height: u32,
    /// Player position after the player's move this turn.
    pub player: Option<Position>,
    /// Directions allowed by the entity's move set.
    pub allowed: Vec<Direction>,
    pub others: Vec<Neighbor>,
    /// In-bounds cells this entity cannot enter right now.
    pub blocked: Vec<Position>,
    /// Rendered grid, see [`render_text_grid`].
    pub grid: String,
}

impl DecisionRequest {
    pub fn build(view: &WorldView<'_>, mover: &Entity) -> Self {
        let layout = view.layout();
        let flying = mover.is_flying();
        let mut blocked = Vec::new();
        for y in 0..layout.height() as i32 {
            for x in 0..layout.width() as i32 {
                let cell = Position::new(x, y);
                if cell != mover.position && !view.is_passable(cell, flying) {
                    blocked.push(cell);
                }
            }
        }

        let others = view
            .entities()
            .iter()
            .filter(|other| other.id != mover.id)
            .map(|other| Neighbor {
                id: other.id,
                name: other.name.clone(),
                kind: other.kind,
                position: other.position,
                offset: mover.position.offset_to(other.position),
            })
            .collect();

        Self {
            turn: view.turn(),
            entity: mover.id,
            name: mover.name.clone(),
            position: mover.position,
            width: layout.width(),
            height: layout.height(),
            player: view.player().map(|player| player.position),
            allowed: mover.policy.move_set().directions(),
            others,
            blocked,
            grid: render_text_grid(view, Some(mover.id)),
        }
    }

    /// True when `position` is inside the grid and not blocked.
    pub fn is_valid(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && position.x < self.width as i32
            && position.y < self.height as i32
            && !self.blocked.contains(&position)
    }
}

/// One member of a batched request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMember {
    pub id: EntityId,
    pub name: String,
    pub position: Position,
    /// Token the member is drawn with in [`BatchRequest::grid`].
    pub token: char,
}

/// One request for every member of a batched backend, in movement order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub turn: u64,
    pub width: u32,
    pub height: u32,
    pub player: Option<Position>,
    pub members: Vec<BatchMember>,
    pub grid: String,
}

impl BatchRequest {
    pub fn build<'e>(view: &WorldView<'_>, members: impl IntoIterator<Item = &'e Entity>) -> Self {
        let layout = view.layout();
        Self {
            turn: view.turn(),
            width: layout.width(),
            height: layout.height(),
            player: view.player().map(|player| player.position),
            members: members
                .into_iter()
                .map(|entity| BatchMember {
                    id: entity.id,
                    name: entity.name.clone(),
                    position: entity.position,
                    token: token_for(entity.kind),
                })
                .collect(),
            grid: render_text_grid(view, None),
        }
    }
}

/// Raw backend answer, before coercion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BackendReply {
    /// Free text that should contain a direction word.
    Direction(String),
    /// JSON-ish text holding one offset, or a list order-matched to a batch.
    Offsets(String),
    /// Replacement grid of entity tokens.
    Grid(String),
    /// Already structured (host functions, scripts).
    Proposal(Proposal),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion failed: {0}")]
    Completion(String),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("backend task failed: {0}")]
    Join(String),
}

/// A backend consulted once per entity, in movement order.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    async fn decide(&self, request: &DecisionRequest) -> Result<BackendReply, BackendError>;
}

/// A backend consulted once per turn for all of its entities.
///
/// Its answer is only a hint: each member's share of the reply is still
/// validated in movement order against the live occupancy grid.
#[async_trait]
pub trait BatchPolicyBackend: Send + Sync {
    async fn decide_batch(&self, request: &BatchRequest) -> Result<BackendReply, BackendError>;
}

pub const EMPTY_TOKEN: char = '.';
pub const WALL_TOKEN: char = '#';
pub const SELF_TOKEN: char = '@';

/// Single-character token for an entity kind.
pub fn token_for(kind: EntityKind) -> char {
    match kind {
        EntityKind::Player => 'P',
        EntityKind::Seeker => 'R',
        EntityKind::Fleer => 'M',
        EntityKind::External => 'E',
    }
}

/// One line per row, one character per cell: `.` empty, `#` wall, `@` the
/// deciding entity, otherwise the occupant's kind token.
pub fn render_text_grid(view: &WorldView<'_>, mover: Option<EntityId>) -> String {
    let layout = view.layout();
    let mut rows = Vec::with_capacity(layout.height() as usize);
    for y in 0..layout.height() as i32 {
        let row: String = (0..layout.width() as i32)
            .map(|x| {
                let cell = Position::new(x, y);
                match view.entities().iter().find(|e| e.position == cell) {
                    Some(entity) if Some(entity.id) == mover => SELF_TOKEN,
                    Some(entity) => token_for(entity.kind),
                    None if layout.is_wall(cell) => WALL_TOKEN,
                    None => EMPTY_TOKEN,
                }
            })
            .collect();
        rows.push(row);
    }
    rows.join("\n")
}
