//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up command/event channels,
//! and exposes a builder-based API for clients to drive the game.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use pug_core::{BackendId, GameConfig, LevelBlueprint, LevelKind};

use crate::api::{
    BackendRegistry, BatchPolicyBackend, InputGate, PolicyBackend, Result, RuntimeError,
    RuntimeHandle,
};
use crate::backends::{
    CompletionClient, DEFAULT_GENERATION_TIMEOUT, DEFAULT_MAX_OPERATIONS, EnemyGenerator,
};
use crate::events::{Event, EventBus, Topic};
use crate::session::GameSession;
use crate::workers::{Command, SimulationWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub game: GameConfig,
    pub level: LevelKind,
    /// Fixed seed for level generation and flee nudges; `None` seeds from
    /// the clock.
    pub seed: Option<u64>,
    /// Enemy count for generated levels that place their own enemies.
    pub enemies: usize,
    /// Upper bound on one external decision.
    pub backend_timeout: Duration,
    /// Upper bound on one enemy-generation request.
    pub generation_timeout: Duration,
    /// Operation budget for embedded scripts.
    pub script_max_operations: u64,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_millis(2_000);
    pub const DEFAULT_ENEMIES: usize = 3;

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `PUG_SEED` - Level and nudge seed (default: current time)
    /// - `PUG_LEVEL` - `template`, `scattered` or `open` (default: template)
    /// - `PUG_WIDTH` / `PUG_HEIGHT` - Grid size (default: 10x10)
    /// - `PUG_ENEMIES` - Enemies placed by the scattered level (default: 3)
    /// - `PUG_MIN_SPAWN_DISTANCE` - Enemy distance from the player (default: 3)
    /// - `PUG_HISTORY_CAPACITY` - Undo depth (default: unlimited)
    /// - `PUG_BACKEND_TIMEOUT_MS` - External decision timeout (default: 2000)
    /// - `PUG_GENERATION_TIMEOUT_MS` - Enemy generation timeout (default: 20000)
    /// - `PUG_SCRIPT_MAX_OPERATIONS` - Script operation budget (default: 50000)
    /// - `PUG_EVENT_BUFFER` - Event channel capacity (default: 100)
    /// - `PUG_COMMAND_BUFFER` - Command queue size (default: 32)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.seed = read_env::<u64>("PUG_SEED");
        if let Some(level) = read_env::<LevelKind>("PUG_LEVEL") {
            config.level = level;
        }
        if let Some(width) = read_env::<u32>("PUG_WIDTH") {
            config.game.width = width.max(1);
        }
        if let Some(height) = read_env::<u32>("PUG_HEIGHT") {
            config.game.height = height.max(1);
        }
        if let Some(enemies) = read_env::<usize>("PUG_ENEMIES") {
            config.enemies = enemies;
        }
        if let Some(distance) = read_env::<u32>("PUG_MIN_SPAWN_DISTANCE") {
            config.game.min_spawn_distance = distance;
        }
        if let Some(capacity) = read_env::<usize>("PUG_HISTORY_CAPACITY") {
            config.game.history_capacity = Some(capacity);
        }
        if let Some(millis) = read_env::<u64>("PUG_BACKEND_TIMEOUT_MS") {
            config.backend_timeout = Duration::from_millis(millis.max(1));
        }
        if let Some(millis) = read_env::<u64>("PUG_GENERATION_TIMEOUT_MS") {
            config.generation_timeout = Duration::from_millis(millis.max(1));
        }
        if let Some(operations) = read_env::<u64>("PUG_SCRIPT_MAX_OPERATIONS") {
            config.script_max_operations = operations.max(1);
        }
        if let Some(capacity) = read_env::<usize>("PUG_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read_env::<usize>("PUG_COMMAND_BUFFER") {
            config.command_buffer_size = capacity.max(1);
        }

        config
    }

    /// The configured seed, or one taken from the clock.
    pub fn resolved_seed(&self) -> u64 {
        self.seed
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().unsigned_abs())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            level: LevelKind::default(),
            seed: None,
            enemies: Self::DEFAULT_ENEMIES,
            backend_timeout: Self::DEFAULT_BACKEND_TIMEOUT,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            script_max_operations: DEFAULT_MAX_OPERATIONS,
            event_buffer_size: 100,
            command_buffer_size: 32,
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.trim().parse().ok()
}

/// Main runtime that orchestrates the game
///
/// Design: Runtime owns the worker and coordinates shutdown.
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    seed: u64,
    sim_worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Seed the level was generated with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Shutdown the runtime gracefully
    ///
    /// The worker stops once every clone of the handle is dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);

        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    blueprint: Option<LevelBlueprint>,
    backends: BackendRegistry,
    completion: Option<Arc<dyn CompletionClient>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            blueprint: None,
            backends: BackendRegistry::new(),
            completion: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this level instead of generating one from the configuration.
    pub fn blueprint(mut self, blueprint: LevelBlueprint) -> Self {
        self.blueprint = Some(blueprint);
        self
    }

    /// Register a per-entity backend under `id`.
    pub fn backend(
        mut self,
        id: impl Into<BackendId>,
        backend: impl PolicyBackend + 'static,
    ) -> Self {
        self.backends.register_single(id, backend);
        self
    }

    /// Register a batched backend under `id`.
    pub fn batch_backend(
        mut self,
        id: impl Into<BackendId>,
        backend: impl BatchPolicyBackend + 'static,
    ) -> Self {
        self.backends.register_batched(id, backend);
        self
    }

    /// Enable enemy generation from descriptions.
    pub fn generator(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.completion = Some(client);
        self
    }

    /// Build the runtime and start the simulation worker.
    pub async fn build(self) -> Result<Runtime> {
        let config = self.config;
        let seed = config.resolved_seed();
        let blueprint = match self.blueprint {
            Some(blueprint) => blueprint,
            None => LevelBlueprint::generate(config.level, &config.game, seed, config.enemies)?,
        };

        let event_bus = EventBus::with_capacity(config.event_buffer_size);
        let mut session = GameSession::new(
            blueprint,
            seed,
            config.game.history_capacity,
            event_bus.clone(),
        )?
        .with_backends(self.backends)
        .with_backend_timeout(config.backend_timeout);
        if let Some(client) = self.completion {
            let generator = EnemyGenerator::new(client, config.script_max_operations)
                .with_timeout(config.generation_timeout);
            session = session.with_generator(generator);
        }

        tracing::info!(
            target: "runtime",
            seed,
            level = <&'static str>::from(config.level),
            "runtime starting"
        );

        let (command_tx, command_rx) = mpsc::channel::<Command>(config.command_buffer_size);
        let gate = InputGate::new();
        let handle = RuntimeHandle::new(command_tx, event_bus.clone(), gate.clone());

        let sim_worker = SimulationWorker::new(session, command_rx, event_bus, gate);
        let sim_worker_handle = tokio::spawn(async move {
            sim_worker.run().await;
        });

        Ok(Runtime {
            handle,
            seed,
            sim_worker_handle,
        })
    }
}
