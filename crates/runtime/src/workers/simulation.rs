//! Simulation worker that owns the authoritative [`GameSession`].
//!
//! Receives commands from [`crate::RuntimeHandle`], resolves turns through
//! the session, and reopens the input gate once a turn is settled.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use pug_core::{Entity, EntityId, LevelLayout, PlayerInput, RenderSnapshot, SpawnSpec, TurnSummary};

use crate::api::{InputGate, Result};
use crate::events::{EventBus, TurnEvent};
use crate::session::GameSession;

/// What to spawn.
pub enum SpawnCommand {
    Spec(SpawnSpec),
    /// Free text, classified like the in-game "add enemy" box.
    Prompt(String),
}

/// Commands that can be sent to the simulation worker
pub enum Command {
    /// Resolve one turn. The input gate is already closed by the sender.
    PlayTurn {
        input: PlayerInput,
        reply: oneshot::Sender<Result<TurnSummary>>,
    },
    Undo {
        reply: oneshot::Sender<Option<RenderSnapshot>>,
    },
    Reset {
        reply: oneshot::Sender<Result<RenderSnapshot>>,
    },
    Spawn {
        request: SpawnCommand,
        reply: oneshot::Sender<Result<EntityId>>,
    },
    Despawn {
        id: EntityId,
        reply: oneshot::Sender<Result<Entity>>,
    },
    QuerySnapshot {
        reply: oneshot::Sender<RenderSnapshot>,
    },
    QueryLayout {
        reply: oneshot::Sender<LevelLayout>,
    },
}

/// Background task that processes gameplay commands.
pub struct SimulationWorker {
    session: GameSession,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    gate: InputGate,
}

impl SimulationWorker {
    pub fn new(
        session: GameSession,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        gate: InputGate,
    ) -> Self {
        tracing::info!(
            target: "runtime::worker",
            entities = session.state().entities().len(),
            turn = session.state().turn,
            "SimulationWorker initialized"
        );

        Self {
            session,
            command_rx,
            event_bus,
            gate,
        }
    }

    /// Main worker loop. Ends when every handle is dropped.
    pub async fn run(mut self) {
        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }
        debug!(target: "runtime::worker", "command channel closed, worker stopping");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::PlayTurn { input, reply } => {
                let result = self.session.play_turn(input).await;
                self.gate.open();
                self.event_bus.publish(TurnEvent::AwaitingInput {
                    turn: self.session.state().turn,
                });
                if reply.send(result).is_err() {
                    debug!("PlayTurn reply channel closed (caller dropped)");
                }
            }
            Command::Undo { reply } => {
                if reply.send(self.session.undo()).is_err() {
                    debug!("Undo reply channel closed (caller dropped)");
                }
            }
            Command::Reset { reply } => {
                if reply.send(self.session.reset()).is_err() {
                    debug!("Reset reply channel closed (caller dropped)");
                }
            }
            Command::Spawn { request, reply } => {
                let result = match request {
                    SpawnCommand::Spec(spec) => self.session.spawn(spec),
                    SpawnCommand::Prompt(text) => self.session.spawn_from_prompt(&text).await,
                };
                if reply.send(result).is_err() {
                    debug!("Spawn reply channel closed (caller dropped)");
                }
            }
            Command::Despawn { id, reply } => {
                if reply.send(self.session.despawn(id)).is_err() {
                    debug!("Despawn reply channel closed (caller dropped)");
                }
            }
            Command::QuerySnapshot { reply } => {
                if reply.send(self.session.snapshot()).is_err() {
                    debug!("QuerySnapshot reply channel closed (caller dropped)");
                }
            }
            Command::QueryLayout { reply } => {
                if reply.send(self.session.layout().clone()).is_err() {
                    debug!("QueryLayout reply channel closed (caller dropped)");
                }
            }
        }
    }
}
