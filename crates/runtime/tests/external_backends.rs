//! External backends degrade to "stay" without disturbing anyone else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use pug_core::{
    EntityId, GameConfig, LevelBlueprint, MovementPolicy, PlayerInput, Position, Proposal,
    Rejection, SpawnSpec, TurnSummary, env,
};
use pug_runtime::{
    BackendError, BackendReply, BatchPolicyBackend, BatchRequest, CompletionClient,
    DecisionRequest, Event, FnPolicy, FormationPlanner, GridPlanner, InputOutcome, PolicyBackend,
    Runtime, RuntimeBuilder, RuntimeConfig, RuntimeHandle, ScriptPolicy, StatusEvent, Topic,
};

struct Sleepy;

#[async_trait]
impl PolicyBackend for Sleepy {
    async fn decide(&self, _request: &DecisionRequest) -> Result<BackendReply, BackendError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(BackendReply::Direction("up".into()))
    }
}

struct Babbler;

#[async_trait]
impl PolicyBackend for Babbler {
    async fn decide(&self, _request: &DecisionRequest) -> Result<BackendReply, BackendError> {
        Ok(BackendReply::Direction("I would rather have a banana".into()))
    }
}

/// Replies to a single entity with a raw offset list.
struct Raw(&'static str);

#[async_trait]
impl PolicyBackend for Raw {
    async fn decide(&self, _request: &DecisionRequest) -> Result<BackendReply, BackendError> {
        Ok(BackendReply::Offsets(self.0.into()))
    }
}

/// Replies with fixed offsets for the whole batch.
struct Fixed(&'static str);

#[async_trait]
impl BatchPolicyBackend for Fixed {
    async fn decide_batch(&self, _request: &BatchRequest) -> Result<BackendReply, BackendError> {
        Ok(BackendReply::Offsets(self.0.into()))
    }
}

struct Canned(&'static str);

#[async_trait]
impl CompletionClient for Canned {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, BackendError> {
        Ok(self.0.into())
    }
}

fn open_level() -> LevelBlueprint {
    env::open(&GameConfig::with_dimensions(10, 10)).unwrap()
}

fn config() -> RuntimeConfig {
    RuntimeConfig {
        seed: Some(7),
        backend_timeout: Duration::from_millis(50),
        ..RuntimeConfig::default()
    }
}

async fn start(builder: RuntimeBuilder) -> (Runtime, RuntimeHandle) {
    let runtime = builder
        .config(config())
        .blueprint(open_level())
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();
    (runtime, handle)
}

async fn skip(handle: &RuntimeHandle) -> TurnSummary {
    match handle.submit_input(PlayerInput::Skip).await.unwrap() {
        InputOutcome::Resolved(summary) => summary,
        InputOutcome::Ignored => panic!("input ignored"),
    }
}

async fn external(handle: &RuntimeHandle, backend: &str, x: i32, y: i32) -> EntityId {
    handle
        .spawn(SpawnSpec::new(
            backend,
            Position::new(x, y),
            MovementPolicy::external(backend),
        ))
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn timed_out_backend_stays_and_later_entities_still_move() {
    let (_runtime, handle) = start(Runtime::builder().backend("sleepy", Sleepy)).await;
    let mut status = handle.subscribe(Topic::Status);

    let stuck = external(&handle, "sleepy", 5, 5).await;
    let roach = handle.spawn(SpawnSpec::roach(Position::new(9, 9))).await.unwrap();

    let summary = skip(&handle).await;
    let stuck_outcome = summary.outcome(stuck).unwrap();
    assert_eq!(stuck_outcome.to, Position::new(5, 5));
    assert_eq!(summary.outcome(roach).unwrap().to, Position::new(8, 8));

    match status.recv().await.unwrap() {
        Event::Status(StatusEvent::BackendUnavailable { entity, backend, .. }) => {
            assert_eq!(entity, stuck);
            assert_eq!(backend, "sleepy");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_reply_means_stay() {
    let (_runtime, handle) = start(Runtime::builder().backend("babbler", Babbler)).await;
    let mut status = handle.subscribe(Topic::Status);
    let id = external(&handle, "babbler", 4, 4).await;

    let summary = skip(&handle).await;
    assert!(!summary.outcome(id).unwrap().moved());
    assert!(matches!(
        status.recv().await.unwrap(),
        Event::Status(StatusEvent::MalformedReply { entity, .. }) if entity == id
    ));
}

#[tokio::test]
async fn huge_numeric_replies_are_rejected_and_the_game_goes_on() {
    let script = ScriptPolicy::compile("far", "#{x: -99999999999, y: 0}", 1_000).unwrap();
    let (_runtime, handle) = start(
        Runtime::builder()
            .backend("huge", Raw("[-1e20, 0]"))
            .backend("far", script),
    )
    .await;
    let huge = external(&handle, "huge", 4, 4).await;
    let far = external(&handle, "far", 6, 6).await;

    let summary = skip(&handle).await;
    for id in [huge, far] {
        let outcome = summary.outcome(id).unwrap();
        assert!(!outcome.moved());
        assert!(matches!(outcome.rejection, Some(Rejection::NotAStep { .. })));
    }

    let next = skip(&handle).await;
    assert_eq!(next.turn, summary.turn + 1);
}

#[tokio::test]
async fn unregistered_backend_means_stay() {
    let (_runtime, handle) = start(Runtime::builder()).await;
    let mut status = handle.subscribe(Topic::Status);
    let id = external(&handle, "nobody", 4, 4).await;

    let summary = skip(&handle).await;
    assert!(!summary.outcome(id).unwrap().moved());
    assert!(matches!(
        status.recv().await.unwrap(),
        Event::Status(StatusEvent::BackendUnavailable { entity, .. }) if entity == id
    ));
}

#[tokio::test]
async fn illegal_external_proposals_are_rejected_by_the_validator() {
    let leap = FnPolicy::new(|_| Proposal::Target(Position::new(9, 9)));
    let (_runtime, handle) = start(Runtime::builder().backend("leap", leap)).await;
    let id = external(&handle, "leap", 2, 2).await;

    let summary = skip(&handle).await;
    let outcome = summary.outcome(id).unwrap();
    assert_eq!(outcome.to, Position::new(2, 2));
    assert!(matches!(outcome.rejection, Some(Rejection::NotAStep { .. })));
}

#[tokio::test]
async fn batched_replies_that_collide_are_revalidated_in_order() {
    // Both members aim for (5, 5); the first in movement order gets it.
    let (_runtime, handle) =
        start(Runtime::builder().batch_backend("swarm", Fixed("[[1, 0], [-1, 0]]"))).await;
    let first = external(&handle, "swarm", 4, 5).await;
    let second = external(&handle, "swarm", 6, 5).await;

    let summary = skip(&handle).await;
    assert_eq!(summary.outcome(first).unwrap().to, Position::new(5, 5));

    let blocked = summary.outcome(second).unwrap();
    assert_eq!(blocked.to, Position::new(6, 5));
    assert_eq!(
        blocked.rejection,
        Some(Rejection::Occupied {
            to: Position::new(5, 5),
            by: first
        })
    );
}

#[tokio::test]
async fn formation_planner_moves_every_member() {
    let reply = Canned("```json\n[[0, 1], [0, 1]]\n```");
    let planner = FormationPlanner::new(Arc::new(reply), "march");
    let (_runtime, handle) = start(Runtime::builder().batch_backend("march", planner)).await;
    let a = external(&handle, "march", 3, 3).await;
    let b = external(&handle, "march", 6, 3).await;

    let summary = skip(&handle).await;
    assert_eq!(summary.outcome(a).unwrap().to, Position::new(3, 4));
    assert_eq!(summary.outcome(b).unwrap().to, Position::new(6, 4));
}

#[tokio::test]
async fn grid_planner_replies_are_mapped_back_to_members() {
    // 3x3 level, player top-left, one member in the centre moving right.
    let level = env::open(&GameConfig::with_dimensions(3, 3)).unwrap();
    let planner = GridPlanner::new(Arc::new(Canned("P..\n..E\n...")), "shuffle");
    let runtime = Runtime::builder()
        .config(config())
        .blueprint(level)
        .batch_backend("grid", planner)
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();
    let id = external(&handle, "grid", 1, 1).await;

    let summary = skip(&handle).await;
    assert_eq!(summary.outcome(id).unwrap().to, Position::new(2, 1));
}
