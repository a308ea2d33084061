//! Seek and flee share one candidate search and differ only in the
//! direction they push.
use crate::env::rng::context;
use crate::state::{Entity, Offset};

use super::{AxisPreference, FleePolicy, MoveSet, Proposal, SeekPolicy, WorldView};

pub(super) fn seek(view: &WorldView<'_>, mover: &Entity, policy: &SeekPolicy) -> Proposal {
    let Some(target) = view.target_position(policy.target) else {
        return Proposal::Stay;
    };
    let heading = mover.position.offset_to(target).signum();
    first_passable(view, mover, heading, policy.axis, &policy.moves, policy.flying)
}

/// Runs directly away from the target. An axis on which the two are aligned
/// gets a deterministic ±1 nudge so the fleer does not stall in a line.
pub(super) fn flee(view: &WorldView<'_>, mover: &Entity, policy: &FleePolicy) -> Proposal {
    let Some(target) = view.target_position(policy.target) else {
        return Proposal::Stay;
    };
    let away = mover.position.offset_to(target).signum().reversed();
    let dx = if away.dx == 0 {
        view.nudge(mover.id, context::FLEE_NUDGE_X)
    } else {
        away.dx
    };
    let dy = if away.dy == 0 {
        view.nudge(mover.id, context::FLEE_NUDGE_Y)
    } else {
        away.dy
    };
    first_passable(
        view,
        mover,
        Offset::new(dx, dy),
        AxisPreference::Vertical,
        &policy.moves,
        policy.flying,
    )
}

/// Diagonal, then preferred axis, then the other axis, then stay.
fn first_passable(
    view: &WorldView<'_>,
    mover: &Entity,
    heading: Offset,
    axis: AxisPreference,
    moves: &MoveSet,
    flying: bool,
) -> Proposal {
    let vertical = Offset::new(0, heading.dy);
    let horizontal = Offset::new(heading.dx, 0);
    let (first, second) = match axis {
        AxisPreference::Vertical => (vertical, horizontal),
        AxisPreference::Horizontal => (horizontal, vertical),
    };

    let diagonal = heading.is_diagonal().then_some(heading);
    diagonal
        .into_iter()
        .chain([first, second])
        .filter(|offset| !offset.is_stay() && moves.allows(*offset))
        .find(|offset| view.is_passable(mover.position.offset(*offset), flying))
        .map_or(Proposal::Stay, Proposal::Step)
}
