//! Property-based checks of the committed-state invariants.
//!
//! Random layouts, random rosters and random input sequences; after every
//! turn every position must be inside the grid, unique, and off walls for
//! walkers.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use proptest::prelude::*;

use pug_core::{
    Direction, GameState, HistoryLedger, LevelLayout, MovementPolicy, PlayerInput, Position,
    SpawnSpec, TurnEngine,
};

fn input_from(index: usize) -> PlayerInput {
    match index {
        0..8 => PlayerInput::Step(Direction::ALL[index]),
        8 => PlayerInput::Skip,
        _ => PlayerInput::Vector { dx: 4, dy: -9 },
    }
}

fn policy_from(index: usize) -> MovementPolicy {
    match index % 4 {
        0 => MovementPolicy::seek(),
        1 => MovementPolicy::flee(),
        2 => MovementPolicy::seek().flying(),
        _ => MovementPolicy::external("absent"),
    }
}

fn build(
    width: u32,
    height: u32,
    walls: &[(i32, i32)],
    enemies: &[(i32, i32)],
    seed: u64,
) -> (LevelLayout, GameState) {
    let walls: Vec<Position> = walls.iter().map(|&(x, y)| Position::new(x, y)).collect();
    let layout = LevelLayout::open(width, height).unwrap().with_walls(&walls);
    let mut state = GameState::new(seed);

    if let Some(cell) = state.nearest_free(&layout, Position::ORIGIN, false) {
        state.spawn(&layout, SpawnSpec::player(cell)).unwrap();
    }
    for (index, &(x, y)) in enemies.iter().enumerate() {
        let policy = policy_from(index);
        if let Some(cell) = state.nearest_free(&layout, Position::new(x, y), policy.is_flying()) {
            state
                .spawn(&layout, SpawnSpec::new("enemy", cell, policy))
                .unwrap();
        }
    }
    (layout, state)
}

fn assert_invariants(layout: &LevelLayout, state: &GameState) -> Result<(), TestCaseError> {
    let mut seen = HashSet::new();
    for entity in state.entities() {
        prop_assert!(layout.contains(entity.position), "{} out of bounds", entity.id);
        prop_assert!(seen.insert(entity.position), "overlap at {}", entity.position);
        if !entity.is_flying() {
            prop_assert!(!layout.is_wall(entity.position), "{} on a wall", entity.id);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn committed_positions_stay_valid(
        width in 2u32..12,
        height in 2u32..12,
        walls in prop::collection::vec((0i32..12, 0i32..12), 0..20),
        enemies in prop::collection::vec((0i32..12, 0i32..12), 0..10),
        inputs in prop::collection::vec(0usize..10, 1..30),
        seed in any::<u64>(),
    ) {
        let (layout, mut state) = build(width, height, &walls, &enemies, seed);
        prop_assume!(state.player().is_some());

        for index in inputs {
            let summary = TurnEngine::new(&mut state, &layout).play(input_from(index)).unwrap();
            for outcome in &summary.outcomes {
                prop_assert!(outcome.from.chebyshev(outcome.to) <= 1);
            }
            assert_invariants(&layout, &state)?;
        }
    }

    #[test]
    fn replays_are_deterministic(
        walls in prop::collection::vec((0i32..10, 0i32..10), 0..15),
        enemies in prop::collection::vec((0i32..10, 0i32..10), 1..8),
        inputs in prop::collection::vec(0usize..10, 1..20),
        seed in any::<u64>(),
    ) {
        let run = || {
            let (layout, mut state) = build(10, 10, &walls, &enemies, seed);
            if state.player().is_some() {
                for &index in &inputs {
                    TurnEngine::new(&mut state, &layout).play(input_from(index)).unwrap();
                }
            }
            state
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn undo_rewinds_every_turn(
        enemies in prop::collection::vec((0i32..10, 0i32..10), 0..6),
        inputs in prop::collection::vec(0usize..10, 1..15),
        seed in any::<u64>(),
    ) {
        let (layout, mut state) = build(10, 10, &[], &enemies, seed);
        let initial = state.clone();
        let mut ledger = HistoryLedger::unbounded();

        for &index in &inputs {
            TurnEngine::new(&mut state, &layout)
                .with_history(&mut ledger)
                .play(input_from(index))
                .unwrap();
        }
        prop_assert_eq!(ledger.len(), inputs.len());

        while let Some(entry) = ledger.undo() {
            state.restore(entry);
        }
        prop_assert_eq!(state, initial);
    }
}
