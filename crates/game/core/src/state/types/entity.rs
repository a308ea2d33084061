use crate::policy::MovementPolicy;

use super::{EntityId, Position};

/// Discriminant of an entity, also used as its tag in occupancy and render grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Player,
    Seeker,
    Fleer,
    External,
}

impl EntityKind {
    pub fn tag(self) -> &'static str {
        self.into()
    }
}

/// A character on the grid.
///
/// `movement_order` is assigned once at creation and is the sole tie-break
/// for the order in which enemies move within a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub position: Position,
    pub movement_order: u32,
    pub policy: MovementPolicy,
}

impl Entity {
    /// Creates an entity whose kind is derived from its policy.
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        position: Position,
        movement_order: u32,
        policy: MovementPolicy,
    ) -> Self {
        Self {
            id,
            kind: policy.kind(),
            name: name.into(),
            position,
            movement_order,
            policy,
        }
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    /// Flying movers ignore walls (but never occupancy).
    pub fn is_flying(&self) -> bool {
        self.policy.is_flying()
    }
}
