use std::collections::VecDeque;
use std::mem;

use crate::grid::{GridModel, LevelLayout, Occupant};
use crate::history::HistoryEntry;
use crate::policy::{self, PlayerInput, Proposal, WorldView};
use crate::state::{Entity, EntityId, GameState};

use super::{MoveOutcome, TurnError, TurnPhase, TurnSummary};

/// An enemy whose decision is due.
///
/// Handed out by [`PendingTurn::next_enemy`] and consumed by
/// [`PendingTurn::settle`]. The entity is a copy taken at decision time.
#[derive(Clone, Debug)]
pub struct EnemyTurn {
    entity: Entity,
}

impl EnemyTurn {
    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }
}

/// A turn in progress.
///
/// The player has already moved when [`PendingTurn::begin`] returns. Enemies
/// are then handed out one at a time in movement order; each must be settled
/// before the next is released, so every decision sees the moves settled
/// before it. Nothing reaches the committed [`GameState`] until
/// [`PendingTurn::commit`]. Dropping an uncommitted turn discards it.
pub struct PendingTurn<'a> {
    state: &'a mut GameState,
    grid: GridModel<'a>,
    working: Vec<Entity>,
    queue: VecDeque<EntityId>,
    in_flight: Option<EntityId>,
    outcomes: Vec<MoveOutcome>,
    snapshot: HistoryEntry,
    input: PlayerInput,
}

impl<'a> PendingTurn<'a> {
    /// Validates the committed state, seeds occupancy and resolves the
    /// player's move.
    ///
    /// On error nothing has been mutated.
    pub fn begin(
        state: &'a mut GameState,
        layout: &'a LevelLayout,
        input: PlayerInput,
    ) -> Result<Self, TurnError> {
        if state.phase != TurnPhase::AwaitingInput {
            return Err(TurnError::NotAwaitingInput { phase: state.phase });
        }

        let players = state.entities().iter().filter(|e| e.is_player()).count();
        match players {
            0 => return Err(TurnError::MissingPlayer),
            1 => {}
            count => return Err(TurnError::MultiplePlayers { count }),
        }

        let mut grid = GridModel::new(layout);
        for entity in state.entities() {
            let occupant = Occupant::new(entity.id, entity.kind);
            if !grid.mark_occupied(entity.position, occupant) {
                return Err(TurnError::CorruptState {
                    entity: entity.id,
                    position: entity.position,
                });
            }
        }

        let working = state.entities().to_vec();
        let mut enemies: Vec<&Entity> = working.iter().filter(|e| !e.is_player()).collect();
        enemies.sort_by_key(|entity| (entity.movement_order, entity.id));
        let queue = enemies.into_iter().map(|entity| entity.id).collect();

        let snapshot = HistoryEntry {
            turn: state.turn,
            entities: working.clone(),
        };

        state.phase = TurnPhase::ResolvingPlayer;
        let mut pending = Self {
            state,
            grid,
            working,
            queue,
            in_flight: None,
            outcomes: Vec::new(),
            snapshot,
            input,
        };
        pending.resolve_player();
        pending.state.phase = TurnPhase::ResolvingEnemies;
        Ok(pending)
    }

    fn resolve_player(&mut self) {
        let Some(index) = self.working.iter().position(Entity::is_player) else {
            return;
        };
        let origin = self.working[index].position;
        self.grid.clear_occupied(origin);

        let proposal = {
            let view = self.view();
            policy::decide(&view, &self.working[index], Some(&self.input))
        };
        self.apply(index, proposal);
    }

    /// Entity list as it stands mid-turn.
    pub fn entities(&self) -> &[Entity] {
        &self.working
    }

    pub fn phase(&self) -> TurnPhase {
        self.state.phase
    }

    /// Turn number being resolved (the committed counter before increment).
    pub fn turn(&self) -> u64 {
        self.state.turn
    }

    /// Pre-turn copy of the entity list, as it will be pushed to history.
    pub fn snapshot(&self) -> &HistoryEntry {
        &self.snapshot
    }

    /// Policy view over the live occupancy grid.
    pub fn view(&self) -> WorldView<'_> {
        WorldView::new(&self.grid, &self.working, self.state.turn, self.state.seed)
    }

    /// Enemies not yet released.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Enemies not yet released, in the order they will be.
    pub fn queued(&self) -> impl Iterator<Item = &Entity> {
        self.queue
            .iter()
            .filter_map(|id| self.working.iter().find(|entity| entity.id == *id))
    }

    /// Releases the next enemy in movement order and frees its cell.
    ///
    /// An enemy released earlier but never settled is settled as "stay"
    /// first.
    pub fn next_enemy(&mut self) -> Option<EnemyTurn> {
        self.settle_in_flight();
        while let Some(id) = self.queue.pop_front() {
            let Some(entity) = self.working.iter().find(|e| e.id == id) else {
                continue;
            };
            self.grid.clear_occupied(entity.position);
            self.in_flight = Some(id);
            return Some(EnemyTurn {
                entity: entity.clone(),
            });
        }
        None
    }

    /// Built-in decision for a released enemy (external policies stay).
    pub fn decide_builtin(&self, enemy: &EnemyTurn) -> Proposal {
        policy::decide(&self.view(), &enemy.entity, None)
    }

    /// Validates a proposal for the released enemy and claims its cell.
    ///
    /// A rejected proposal commits "stay". Settling an enemy that is no
    /// longer in flight returns its recorded outcome unchanged.
    pub fn settle(&mut self, enemy: EnemyTurn, proposal: Proposal) -> MoveOutcome {
        if self.in_flight != Some(enemy.id()) {
            if let Some(outcome) = self.outcomes.iter().find(|o| o.id == enemy.id()) {
                return outcome.clone();
            }
            return MoveOutcome::stayed(&enemy.entity, proposal);
        }
        self.in_flight = None;
        match self.working.iter().position(|e| e.id == enemy.id()) {
            Some(index) => self.apply(index, proposal),
            None => MoveOutcome::stayed(&enemy.entity, proposal),
        }
    }

    fn settle_in_flight(&mut self) {
        if let Some(id) = self.in_flight.take()
            && let Some(index) = self.working.iter().position(|e| e.id == id)
        {
            self.apply(index, Proposal::Stay);
        }
    }

    /// Validates, claims the destination and records the outcome. The
    /// mover's cell must already be cleared.
    fn apply(&mut self, index: usize, proposal: Proposal) -> MoveOutcome {
        let mover = &self.working[index];
        let from = mover.position;
        let occupant = Occupant::new(mover.id, mover.kind);
        let verdict = policy::validate(&self.view(), mover, proposal);

        let mut to = verdict.unwrap_or(from);
        if !self.grid.mark_occupied(to, occupant) {
            to = from;
            self.grid.mark_occupied(from, occupant);
        }
        self.working[index].position = to;

        let outcome = MoveOutcome {
            id: occupant.id,
            from,
            to,
            proposal,
            rejection: verdict.err(),
        };
        self.outcomes.push(outcome.clone());
        outcome
    }

    /// Settles everything still pending with built-in decisions, then
    /// replaces the committed entity list and advances the turn counter.
    ///
    /// Returns the summary and the pre-turn history entry.
    pub fn commit(mut self) -> (TurnSummary, HistoryEntry) {
        while let Some(enemy) = self.next_enemy() {
            let proposal = self.decide_builtin(&enemy);
            self.settle(enemy, proposal);
        }

        self.state.phase = TurnPhase::Committed;
        let entities = mem::take(&mut self.working);
        self.state.commit_entities(entities);
        self.state.turn += 1;

        let summary = TurnSummary {
            turn: self.state.turn,
            input: self.input,
            outcomes: mem::take(&mut self.outcomes),
        };
        (summary, mem::take(&mut self.snapshot))
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        self.state.phase = TurnPhase::AwaitingInput;
    }
}
