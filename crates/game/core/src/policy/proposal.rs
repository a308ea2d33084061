use crate::state::{Entity, EntityId, Offset, Position};

use super::WorldView;

/// What a policy (built-in or external) wants an entity to do this turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Proposal {
    #[default]
    Stay,
    /// Relative move from the current position.
    Step(Offset),
    /// Absolute destination.
    Target(Position),
}

impl Proposal {
    pub fn offset_from(&self, origin: Position) -> Offset {
        match *self {
            Self::Stay => Offset::STAY,
            Self::Step(offset) => offset,
            Self::Target(position) => origin.offset_to(position),
        }
    }
}

/// Why a proposal was turned into "stay".
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rejection {
    #[error("offset {offset} is more than one step")]
    NotAStep { offset: Offset },

    #[error("offset {offset} is not in the mover's move set")]
    NotInMoveSet { offset: Offset },

    #[error("destination {to} is outside the grid")]
    OutOfBounds { to: Position },

    #[error("destination {to} is a wall")]
    Wall { to: Position },

    #[error("destination {to} is already taken by {by}")]
    Occupied { to: Position, by: EntityId },
}

/// Checks a proposal against the step rule, the mover's move set, bounds,
/// walls and live occupancy, in that order.
///
/// Returns the destination to commit, which is the current position for
/// `Stay`.
pub fn validate(
    view: &WorldView<'_>,
    mover: &Entity,
    proposal: Proposal,
) -> Result<Position, Rejection> {
    let offset = proposal.offset_from(mover.position);
    if offset.is_stay() {
        return Ok(mover.position);
    }
    if !offset.is_step() {
        return Err(Rejection::NotAStep { offset });
    }
    if !mover.policy.move_set().allows(offset) {
        return Err(Rejection::NotInMoveSet { offset });
    }

    let to = mover.position.offset(offset);
    let layout = view.layout();
    if !layout.contains(to) {
        return Err(Rejection::OutOfBounds { to });
    }
    if !mover.is_flying() && layout.is_wall(to) {
        return Err(Rejection::Wall { to });
    }
    if let Some(occupant) = view.grid().occupancy().get(to)
        && occupant.id != mover.id
    {
        return Err(Rejection::Occupied {
            to,
            by: occupant.id,
        });
    }
    Ok(to)
}
