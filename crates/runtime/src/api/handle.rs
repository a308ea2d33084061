//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! playing turns, editing the roster or streaming events from specific
//! topics.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, mpsc, oneshot};

use pug_core::{Entity, EntityId, LevelLayout, PlayerInput, RenderSnapshot, SpawnSpec, TurnSummary};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, StatusEvent, Topic};
use crate::workers::{Command, SpawnCommand};

/// Lets exactly one player input through until the worker has finished
/// resolving it.
#[derive(Clone, Debug, Default)]
pub struct InputGate {
    busy: Arc<AtomicBool>,
}

impl InputGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the gate; false when a turn is already in flight.
    pub fn try_close(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn open(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }
}

/// Reopens the gate if the command never reached the worker.
struct Unsent<'a>(Option<&'a InputGate>);

impl Unsent<'_> {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for Unsent<'_> {
    fn drop(&mut self) {
        if let Some(gate) = self.0 {
            gate.open();
        }
    }
}

/// What happened to a submitted input.
#[derive(Debug, Clone)]
pub enum InputOutcome {
    Resolved(TurnSummary),
    /// A turn was still resolving; the input was dropped, not queued.
    Ignored,
}

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    gate: InputGate,
}

impl RuntimeHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
        gate: InputGate,
    ) -> Self {
        Self {
            command_tx,
            event_bus,
            gate,
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Plays one turn with the given player input.
    ///
    /// Input that arrives while another turn is resolving is dropped and
    /// reported as [`InputOutcome::Ignored`].
    pub async fn submit_input(&self, input: PlayerInput) -> Result<InputOutcome> {
        if !self.gate.try_close() {
            tracing::debug!(target: "runtime::handle", ?input, "input ignored, turn in flight");
            self.event_bus.publish(StatusEvent::InputIgnored);
            return Ok(InputOutcome::Ignored);
        }

        let mut unsent = Unsent(Some(&self.gate));
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::PlayTurn {
                input,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;
        unsent.disarm();

        let summary = reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)??;
        Ok(InputOutcome::Resolved(summary))
    }

    /// True when no turn is in flight.
    pub fn is_awaiting_input(&self) -> bool {
        self.gate.is_open()
    }

    /// Rewinds the last committed turn. `None` when there is nothing to undo.
    pub async fn undo(&self) -> Result<Option<RenderSnapshot>> {
        self.request(|reply| Command::Undo { reply }).await
    }

    /// Restores the level's initial entities and clears the history.
    pub async fn reset(&self) -> Result<RenderSnapshot> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    /// Spawns an entity at the requested cell or the nearest free one.
    pub async fn spawn(&self, spec: SpawnSpec) -> Result<EntityId> {
        self.request(|reply| Command::Spawn {
            request: SpawnCommand::Spec(spec),
            reply,
        })
        .await?
    }

    /// Spawns from a free-text request ("roach", "a roach mother", "a ghost
    /// called Boo that ...").
    pub async fn spawn_from_prompt(&self, text: impl Into<String>) -> Result<EntityId> {
        let text = text.into();
        self.request(|reply| Command::Spawn {
            request: SpawnCommand::Prompt(text),
            reply,
        })
        .await?
    }

    pub async fn despawn(&self, id: EntityId) -> Result<Entity> {
        self.request(|reply| Command::Despawn { id, reply }).await?
    }

    /// Snapshot of the committed state.
    pub async fn snapshot(&self) -> Result<RenderSnapshot> {
        self.request(|reply| Command::QuerySnapshot { reply }).await
    }

    /// Terrain and obstacle layers of the current level.
    pub async fn layout(&self) -> Result<LevelLayout> {
        self.request(|reply| Command::QueryLayout { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Turn` - Commits, undo, reset and roster changes
    /// - `Topic::Status` - Degraded backends, ignored input, aborted turns
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
