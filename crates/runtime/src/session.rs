//! One running game: level, committed state, undo history and backends.
//!
//! The session is owned by the simulation worker and never shared; every
//! method runs to completion before the next command is looked at.
use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use pug_core::{
    BackendId, Entity, EntityId, GameConfig, GameError, GameState, HistoryLedger, LevelBlueprint,
    LevelLayout, MoveSet, MovementPolicy, PlayerInput, Position, RenderSnapshot, SpawnError,
    SpawnSpec, TurnSummary, classify_spawn_prompt,
};

use crate::api::{BackendRegistry, Result, RuntimeError};
use crate::backends::EnemyGenerator;
use crate::events::{EventBus, StatusEvent, TurnEvent};
use crate::resolver::{ResolveContext, resolve_turn};
use crate::runtime::RuntimeConfig;

/// Prefix of the backend ids generated enemies are registered under.
pub const GENERATED_BACKEND_PREFIX: &str = "generated/";

pub struct GameSession {
    blueprint: LevelBlueprint,
    seed: u64,
    state: GameState,
    history: HistoryLedger,
    backends: BackendRegistry,
    generator: Option<EnemyGenerator>,
    backend_timeout: Duration,
    events: EventBus,
}

impl GameSession {
    /// Spawns the blueprint's entities in list order.
    pub fn new(
        blueprint: LevelBlueprint,
        seed: u64,
        history_capacity: Option<usize>,
        events: EventBus,
    ) -> Result<Self> {
        let state = GameState::from_blueprint(&blueprint, seed)?;
        info!(
            target: "runtime::session",
            seed,
            width = blueprint.layout.width(),
            height = blueprint.layout.height(),
            entities = state.entities().len(),
            "session created"
        );
        Ok(Self {
            blueprint,
            seed,
            state,
            history: HistoryLedger::new(history_capacity),
            backends: BackendRegistry::new(),
            generator: None,
            backend_timeout: RuntimeConfig::DEFAULT_BACKEND_TIMEOUT,
            events,
        })
    }

    pub fn with_backends(mut self, backends: BackendRegistry) -> Self {
        self.backends = backends;
        self
    }

    pub fn with_generator(mut self, generator: EnemyGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn layout(&self) -> &LevelLayout {
        &self.blueprint.layout
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn backends_mut(&mut self) -> &mut BackendRegistry {
        &mut self.backends
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::capture(&self.state, &self.blueprint.layout)
    }

    /// Resolves one turn and records it for undo.
    ///
    /// A structural failure publishes `TurnAborted` and leaves everything
    /// as it was.
    pub async fn play_turn(&mut self, input: PlayerInput) -> Result<TurnSummary> {
        let ctx = ResolveContext {
            layout: &self.blueprint.layout,
            backends: &self.backends,
            timeout: self.backend_timeout,
            events: &self.events,
        };
        match resolve_turn(&mut self.state, input, ctx).await {
            Ok((summary, entry)) => {
                self.history.push(entry);
                debug!(
                    target: "runtime::session",
                    turn = summary.turn,
                    rejected = summary.rejections().count(),
                    "turn committed"
                );
                self.events.publish(TurnEvent::Committed {
                    summary: summary.clone(),
                    snapshot: self.snapshot(),
                });
                Ok(summary)
            }
            Err(err) => {
                warn!(
                    target: "runtime::session",
                    code = err.error_code(),
                    error = %err,
                    "turn aborted"
                );
                self.events.publish(StatusEvent::TurnAborted {
                    code: err.error_code().to_owned(),
                    error: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// Restores the state from before the last committed turn.
    ///
    /// Returns `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<RenderSnapshot> {
        let entry = self.history.undo()?;
        self.state.restore(entry);
        self.prune_generated_backends();
        let snapshot = self.snapshot();
        debug!(target: "runtime::session", turn = self.state.turn, "turn undone");
        self.events.publish(TurnEvent::Rewound {
            snapshot: snapshot.clone(),
        });
        Some(snapshot)
    }

    /// Rebuilds the level's initial entities and clears the history.
    pub fn reset(&mut self) -> Result<RenderSnapshot> {
        self.state = GameState::from_blueprint(&self.blueprint, self.seed)?;
        self.history.reset();
        self.prune_generated_backends();
        let snapshot = self.snapshot();
        info!(target: "runtime::session", "session reset");
        self.events.publish(TurnEvent::Reset {
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// Spawns at the requested cell, or the nearest free one.
    pub fn spawn(&mut self, mut spec: SpawnSpec) -> Result<EntityId> {
        let layout = &self.blueprint.layout;
        spec.position = self
            .state
            .nearest_free(layout, spec.position, spec.policy.is_flying())
            .ok_or(SpawnError::NoFreeCell)?;

        let (name, position) = (spec.name.clone(), spec.position);
        let id = self.state.spawn(layout, spec)?;
        info!(
            target: "runtime::session",
            entity = %id,
            name = %name,
            position = %position,
            "entity spawned"
        );
        self.events.publish(TurnEvent::Spawned {
            id,
            name,
            position,
            snapshot: self.snapshot(),
        });
        Ok(id)
    }

    /// Spawns from a free-text request at the default spawn cell.
    ///
    /// "mother"/"flee" gives a roach mother, a name ("called X") asks the
    /// generator for a scripted enemy, anything else gives a roach.
    pub async fn spawn_from_prompt(&mut self, text: &str) -> Result<EntityId> {
        let (x, y) = GameConfig::DEFAULT_SPAWN;
        let preferred = Position::new(x, y);

        let request = classify_spawn_prompt(text);
        debug!(target: "runtime::session", kind = request.label(), "spawn prompt classified");
        match request.builtin_spec(preferred) {
            Some(spec) => self.spawn(spec),
            None => self.spawn_generated(text.trim(), preferred).await,
        }
    }

    async fn spawn_generated(
        &mut self,
        description: &str,
        preferred: Position,
    ) -> Result<EntityId> {
        let Some(generator) = self.generator.as_ref() else {
            self.generation_failed(description, &RuntimeError::GeneratorNotConfigured);
            return Err(RuntimeError::GeneratorNotConfigured);
        };
        let enemy = match generator.generate(description).await {
            Ok(enemy) => enemy,
            Err(err) => {
                self.generation_failed(description, &err);
                return Err(err.into());
            }
        };

        let backend = self.unique_backend_id(&enemy.name);
        let policy = MovementPolicy::external(backend.clone()).with_moves(MoveSet::All);
        let id = self.spawn(SpawnSpec::new(enemy.name, preferred, policy))?;
        self.backends.register_single(backend, enemy.policy);
        Ok(id)
    }

    fn generation_failed(&self, description: &str, err: &dyn std::error::Error) {
        warn!(
            target: "runtime::generator",
            error = %err,
            "enemy generation failed"
        );
        self.events.publish(StatusEvent::GenerationFailed {
            description: description.to_owned(),
            reason: err.to_string(),
        });
    }

    fn unique_backend_id(&self, name: &str) -> BackendId {
        let base = format!("{GENERATED_BACKEND_PREFIX}{name}");
        let mut candidate = BackendId::new(base.clone());
        let mut suffix = 2;
        while self.backends.contains(&candidate) {
            candidate = BackendId::new(format!("{base}-{suffix}"));
            suffix += 1;
        }
        candidate
    }

    /// Unregisters generated backends that no entity, current or kept for
    /// undo, still points at.
    fn prune_generated_backends(&mut self) {
        let in_use: HashSet<&BackendId> = self
            .state
            .entities()
            .iter()
            .chain(self.history.entries().flat_map(|entry| entry.entities.iter()))
            .filter_map(|entity| entity.policy.backend())
            .collect();
        let dropped = self.backends.retain(|id| {
            !id.as_str().starts_with(GENERATED_BACKEND_PREFIX) || in_use.contains(id)
        });
        if !dropped.is_empty() {
            debug!(
                target: "runtime::session",
                dropped = dropped.len(),
                "pruned generated backends"
            );
        }
    }

    pub fn despawn(&mut self, id: EntityId) -> Result<Entity> {
        let entity = self
            .state
            .despawn(id)
            .ok_or(RuntimeError::UnknownEntity(id))?;
        self.prune_generated_backends();
        info!(target: "runtime::session", entity = %id, name = %entity.name, "entity despawned");
        self.events.publish(TurnEvent::Despawned {
            id,
            snapshot: self.snapshot(),
        });
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use pug_core::env;

    use super::*;
    use crate::api::BackendError;
    use crate::backends::CompletionClient;

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionClient for Canned {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
        ) -> std::result::Result<String, BackendError> {
            Ok(self.0.to_owned())
        }
    }

    fn session(width: u32, height: u32) -> GameSession {
        let blueprint = env::open(&GameConfig::with_dimensions(width, height)).unwrap();
        let generator = EnemyGenerator::new(Arc::new(Canned("#{dx: 1, dy: 0}")), 1_000);
        GameSession::new(blueprint, 3, None, EventBus::new())
            .unwrap()
            .with_generator(generator)
    }

    fn generated(name: &str) -> BackendId {
        BackendId::new(format!("{GENERATED_BACKEND_PREFIX}{name}"))
    }

    #[tokio::test]
    async fn failed_generated_spawn_registers_nothing() {
        let mut session = session(1, 1);

        let err = session.spawn_from_prompt("a ghost called Boo").await;
        assert!(matches!(err, Err(RuntimeError::Spawn(SpawnError::NoFreeCell))));
        assert!(session.backends.is_empty());
    }

    #[tokio::test]
    async fn generated_backends_live_as_long_as_their_entities() {
        let mut session = session(10, 10);
        let boo = session.spawn_from_prompt("a ghost called Boo").await.unwrap();
        let gus = session.spawn_from_prompt("a ghost called Gus").await.unwrap();
        assert!(session.backends.contains(&generated("Gus")));

        // Never part of a committed turn, so nothing can bring it back.
        session.despawn(gus).unwrap();
        assert!(!session.backends.contains(&generated("Gus")));

        // Still referenced by the undo history.
        session.play_turn(PlayerInput::Skip).await.unwrap();
        session.despawn(boo).unwrap();
        assert!(session.backends.contains(&generated("Boo")));
        session.undo().unwrap();
        assert!(session.state.entity(boo).is_some());

        session.reset().unwrap();
        assert!(session.backends.is_empty());
    }
}
