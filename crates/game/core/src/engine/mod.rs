//! Turn resolution.
//!
//! A turn moves the player first and then every other entity in ascending
//! `movement_order`, each validated against an occupancy grid that already
//! reflects the moves settled before it. Processing order alone decides who
//! claims a contested cell.
//!
//! [`PendingTurn`] exposes the turn one step at a time so an async caller can
//! await external decisions between steps. [`TurnEngine`] drives the same
//! steps synchronously with built-in policies.
mod errors;
mod pending;

pub use errors::{TurnError, TurnPhase};
pub use pending::{EnemyTurn, PendingTurn};

use crate::grid::LevelLayout;
use crate::history::HistoryLedger;
use crate::policy::{PlayerInput, Proposal, Rejection, WorldView};
use crate::state::{Entity, EntityId, GameState, Position};

/// What happened to one entity during a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoveOutcome {
    pub id: EntityId,
    pub from: Position,
    pub to: Position,
    pub proposal: Proposal,
    /// Set when the proposal was refused and the entity stayed instead.
    pub rejection: Option<Rejection>,
}

impl MoveOutcome {
    fn stayed(entity: &Entity, proposal: Proposal) -> Self {
        Self {
            id: entity.id,
            from: entity.position,
            to: entity.position,
            proposal,
            rejection: None,
        }
    }

    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

/// Result of a committed turn.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnSummary {
    /// Turn counter after the commit.
    pub turn: u64,
    pub input: PlayerInput,
    /// Player first, then enemies in the order they were settled.
    pub outcomes: Vec<MoveOutcome>,
}

impl TurnSummary {
    pub fn outcome(&self, id: EntityId) -> Option<&MoveOutcome> {
        self.outcomes.iter().find(|outcome| outcome.id == id)
    }

    pub fn rejections(&self) -> impl Iterator<Item = &MoveOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.rejection.is_some())
    }
}

/// Synchronous driver for [`PendingTurn`].
///
/// External entities stay unless a decision closure supplies a proposal for
/// them (see [`TurnEngine::play_with`]).
pub struct TurnEngine<'a> {
    state: &'a mut GameState,
    layout: &'a LevelLayout,
    history: Option<&'a mut HistoryLedger>,
}

impl<'a> TurnEngine<'a> {
    pub fn new(state: &'a mut GameState, layout: &'a LevelLayout) -> Self {
        Self {
            state,
            layout,
            history: None,
        }
    }

    /// Records the pre-turn entity list of every committed turn.
    pub fn with_history(mut self, history: &'a mut HistoryLedger) -> Self {
        self.history = Some(history);
        self
    }

    pub fn play(&mut self, input: PlayerInput) -> Result<TurnSummary, TurnError> {
        self.play_with(input, |_, _| None)
    }

    /// Resolves a turn, asking `decide` first for every enemy and falling
    /// back to the built-in policy when it returns `None`.
    pub fn play_with<F>(
        &mut self,
        input: PlayerInput,
        mut decide: F,
    ) -> Result<TurnSummary, TurnError>
    where
        F: FnMut(&EnemyTurn, &WorldView<'_>) -> Option<Proposal>,
    {
        let mut pending = PendingTurn::begin(&mut *self.state, self.layout, input)?;
        while let Some(enemy) = pending.next_enemy() {
            let proposal = decide(&enemy, &pending.view())
                .unwrap_or_else(|| pending.decide_builtin(&enemy));
            pending.settle(enemy, proposal);
        }
        let (summary, entry) = pending.commit();
        if let Some(history) = self.history.as_deref_mut() {
            history.push(entry);
        }
        Ok(summary)
    }
}
