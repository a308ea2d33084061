use crate::state::{Direction, Entity, Offset};

use super::{Proposal, WorldView};

/// A single player command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlayerInput {
    Step(Direction),
    /// Pass the turn without moving.
    Skip,
    /// Pointer-style vector (e.g. from a click); only the sign of each axis
    /// is used.
    Vector { dx: i32, dy: i32 },
}

impl PlayerInput {
    pub fn offset(&self) -> Offset {
        match *self {
            Self::Step(direction) => direction.offset(),
            Self::Skip => Offset::STAY,
            Self::Vector { dx, dy } => Offset::new(dx, dy).signum(),
        }
    }
}

impl From<Direction> for PlayerInput {
    fn from(direction: Direction) -> Self {
        Self::Step(direction)
    }
}

/// Clamp to the grid, then stay if the cell cannot be entered.
///
/// The turn still advances when the player ends up staying.
pub(super) fn decide(view: &WorldView<'_>, mover: &Entity, input: &PlayerInput) -> Proposal {
    let offset = input.offset();
    if offset.is_stay() {
        return Proposal::Stay;
    }
    let destination = view.layout().clamp(mover.position.offset(offset));
    if destination == mover.position || !view.is_passable(destination, mover.is_flying()) {
        return Proposal::Stay;
    }
    Proposal::Target(destination)
}
