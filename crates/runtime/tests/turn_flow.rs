//! End-to-end turn handling through the runtime handle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use pug_core::{
    Direction, EntityKind, GameConfig, MovementPolicy, PlayerInput, Position, SpawnSpec,
    TurnError, env,
};
use pug_runtime::{
    BackendError, BackendReply, CompletionClient, DecisionRequest, Event, GenerationError,
    InputOutcome, PolicyBackend, Runtime, RuntimeBuilder, RuntimeConfig, RuntimeError,
    RuntimeHandle, StatusEvent, Topic, TurnEvent,
};

/// Answers "left" once released.
struct Gated(Arc<Notify>);

#[async_trait]
impl PolicyBackend for Gated {
    async fn decide(&self, _request: &DecisionRequest) -> Result<BackendReply, BackendError> {
        self.0.notified().await;
        Ok(BackendReply::Direction("left".into()))
    }
}

struct Canned(&'static str);

#[async_trait]
impl CompletionClient for Canned {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, BackendError> {
        Ok(self.0.into())
    }
}

/// Never answers.
struct Silent;

#[async_trait]
impl CompletionClient for Silent {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, BackendError> {
        std::future::pending().await
    }
}

async fn start(builder: RuntimeBuilder) -> (Runtime, RuntimeHandle) {
    let config = RuntimeConfig {
        seed: Some(11),
        backend_timeout: Duration::from_secs(5),
        ..RuntimeConfig::default()
    };
    let runtime = builder
        .config(config)
        .blueprint(env::open(&GameConfig::with_dimensions(10, 10)).unwrap())
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();
    (runtime, handle)
}

async fn player_position(handle: &RuntimeHandle) -> Position {
    handle.snapshot().await.unwrap().player().unwrap().position
}

#[tokio::test]
async fn input_during_resolution_is_dropped() {
    let release = Arc::new(Notify::new());
    let (_runtime, handle) =
        start(Runtime::builder().backend("gated", Gated(Arc::clone(&release)))).await;
    let mut status = handle.subscribe(Topic::Status);
    let gated = handle
        .spawn(SpawnSpec::new(
            "gated",
            Position::new(5, 5),
            MovementPolicy::external("gated"),
        ))
        .await
        .unwrap();

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.submit_input(PlayerInput::Step(Direction::Right)).await }
    });
    while handle.is_awaiting_input() {
        tokio::task::yield_now().await;
    }

    let second = handle.submit_input(PlayerInput::Step(Direction::Down)).await.unwrap();
    assert!(matches!(second, InputOutcome::Ignored));
    assert!(matches!(
        status.recv().await.unwrap(),
        Event::Status(StatusEvent::InputIgnored)
    ));

    release.notify_one();
    let InputOutcome::Resolved(summary) = first.await.unwrap().unwrap() else {
        panic!("first input should resolve");
    };
    assert_eq!(summary.outcome(gated).unwrap().to, Position::new(4, 5));
    assert!(handle.is_awaiting_input());
    // Only the first input moved the player.
    assert_eq!(player_position(&handle).await, Position::new(1, 0));
}

#[tokio::test]
async fn undo_rewinds_one_turn_at_a_time() {
    let (_runtime, handle) = start(Runtime::builder()).await;
    let mut turns = handle.subscribe(Topic::Turn);

    handle
        .submit_input(PlayerInput::Step(Direction::Right))
        .await
        .unwrap();
    handle
        .submit_input(PlayerInput::Step(Direction::Down))
        .await
        .unwrap();
    assert_eq!(player_position(&handle).await, Position::new(1, 1));

    let rewound = handle.undo().await.unwrap().unwrap();
    assert_eq!(rewound.player().unwrap().position, Position::new(1, 0));
    assert_eq!(rewound.turn, 1);
    handle.undo().await.unwrap().unwrap();
    assert!(handle.undo().await.unwrap().is_none());
    assert_eq!(player_position(&handle).await, Position::ORIGIN);

    let mut committed = 0;
    let mut rewinds = 0;
    while let Ok(event) = turns.try_recv() {
        match event {
            Event::Turn(TurnEvent::Committed { .. }) => committed += 1,
            Event::Turn(TurnEvent::Rewound { .. }) => rewinds += 1,
            _ => {}
        }
    }
    assert_eq!((committed, rewinds), (2, 2));
}

#[tokio::test]
async fn reset_restores_the_level_roster() {
    let (_runtime, handle) = start(Runtime::builder()).await;
    handle
        .spawn(SpawnSpec::roach(Position::new(6, 6)))
        .await
        .unwrap();
    handle.submit_input(PlayerInput::Skip).await.unwrap();

    let snapshot = handle.reset().await.unwrap();
    assert_eq!(snapshot.turn, 0);
    assert_eq!(snapshot.entities.len(), 1);
    assert!(handle.undo().await.unwrap().is_none());
}

#[tokio::test]
async fn prompts_spawn_builtin_enemies_near_the_default_cell() {
    let (_runtime, handle) = start(Runtime::builder()).await;

    let mother = handle.spawn_from_prompt("a roach mother").await.unwrap();
    let roach = handle.spawn_from_prompt("roach").await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    let mother = snapshot.entities.iter().find(|e| e.id == mother).unwrap();
    let roach = snapshot.entities.iter().find(|e| e.id == roach).unwrap();
    assert_eq!(mother.kind, EntityKind::Fleer);
    assert_eq!(mother.position, Position::new(8, 8));
    assert_eq!(roach.kind, EntityKind::Seeker);
    assert_eq!(roach.position, Position::new(7, 7));
}

#[tokio::test]
async fn described_enemies_are_generated_and_move_by_script() {
    let client = Arc::new(Canned("```rhai\n#{dx: 1, dy: 0}\n```"));
    let (_runtime, handle) = start(Runtime::builder().generator(client)).await;

    let id = handle
        .spawn_from_prompt("a ghost called Boo that drifts right")
        .await
        .unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    let boo = snapshot.entity_at(Position::new(8, 8)).unwrap();
    assert_eq!(boo.id, id);
    assert_eq!(boo.name, "Boo");
    assert_eq!(boo.kind, EntityKind::External);

    let InputOutcome::Resolved(summary) = handle.submit_input(PlayerInput::Skip).await.unwrap()
    else {
        panic!("input ignored");
    };
    assert_eq!(summary.outcome(id).unwrap().to, Position::new(9, 8));
}

#[tokio::test]
async fn described_enemies_need_a_generator() {
    let (_runtime, handle) = start(Runtime::builder()).await;
    let mut status = handle.subscribe(Topic::Status);

    let err = handle.spawn_from_prompt("a ghost called Boo").await;
    assert!(matches!(err, Err(RuntimeError::GeneratorNotConfigured)));
    assert!(matches!(
        status.recv().await.unwrap(),
        Event::Status(StatusEvent::GenerationFailed { .. })
    ));
    assert_eq!(handle.snapshot().await.unwrap().entities.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_generation_times_out_and_undo_still_answers() {
    let (_runtime, handle) = start(Runtime::builder().generator(Arc::new(Silent))).await;
    let mut status = handle.subscribe(Topic::Status);
    handle
        .submit_input(PlayerInput::Step(Direction::Right))
        .await
        .unwrap();

    let prompt = tokio::spawn({
        let handle = handle.clone();
        async move { handle.spawn_from_prompt("a ghost called Boo").await }
    });
    tokio::task::yield_now().await;

    let undone = tokio::time::timeout(Duration::from_secs(60), handle.undo())
        .await
        .expect("undo should not wait on the generator");
    assert_eq!(undone.unwrap().unwrap().turn, 0);

    assert!(matches!(
        prompt.await.unwrap(),
        Err(RuntimeError::Generation(GenerationError::Timeout(_)))
    ));
    match status.recv().await.unwrap() {
        Event::Status(StatusEvent::GenerationFailed { description, .. }) => {
            assert_eq!(description, "a ghost called Boo");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(handle.snapshot().await.unwrap().entities.len(), 1);
}

#[tokio::test]
async fn turn_without_a_player_aborts_and_reopens_input() {
    let (_runtime, handle) = start(Runtime::builder()).await;
    let mut status = handle.subscribe(Topic::Status);
    let player = handle.snapshot().await.unwrap().player().unwrap().id;
    handle.despawn(player).await.unwrap();

    let err = handle.submit_input(PlayerInput::Skip).await;
    assert!(matches!(
        err,
        Err(RuntimeError::Turn(TurnError::MissingPlayer))
    ));
    match status.recv().await.unwrap() {
        Event::Status(StatusEvent::TurnAborted { code, .. }) => {
            assert_eq!(code, "TURN_MISSING_PLAYER");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(handle.is_awaiting_input());
    assert_eq!(handle.snapshot().await.unwrap().turn, 0);
}

#[tokio::test]
async fn despawning_an_unknown_entity_fails() {
    let (_runtime, handle) = start(Runtime::builder()).await;
    let player = handle.snapshot().await.unwrap().player().unwrap().id;
    handle.despawn(player).await.unwrap();
    assert!(matches!(
        handle.despawn(player).await,
        Err(RuntimeError::UnknownEntity(id)) if id == player
    ));
}
