//! Glue code tying the runtime, keyboard and terminal UI together.
//!
//! The loop never awaits a turn: commands run on their own tasks, so a slow
//! backend leaves the UI responsive and extra keys hit the runtime's input
//! gate instead of piling up. State arrives back over the event bus.
use std::future::Future;

use anyhow::Result;
use crossterm::event::{self as term_event, Event as TermEvent, KeyEventKind};
use tokio::sync::{broadcast, broadcast::error::RecvError, mpsc};
use tokio::time::{self, Duration};

use pug_core::{GameConfig, LevelLayout, Position, RenderSnapshot, SpawnSpec};
use pug_runtime::{Event, Runtime, RuntimeError, RuntimeHandle, Topic, TurnEvent};

use crate::config::ClientConfig;
use crate::input::{KeyAction, PromptEdit, handle_key, handle_prompt_key};
use crate::presentation::messages::{MessageLevel, awaiting_move};
use crate::presentation::ui::{self, View};
use crate::presentation::{MessageLog, terminal};

const FRAME_INTERVAL_MS: u64 = 16;

type Notice = (String, MessageLevel);

pub struct App {
    config: ClientConfig,
}

impl App {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let runtime = Runtime::builder()
            .config(self.config.runtime.clone())
            .build()
            .await?;
        let handle = runtime.handle();
        tracing::info!(seed = runtime.seed(), "runtime ready");

        let turn_rx = handle.subscribe(Topic::Turn);
        let status_rx = handle.subscribe(Topic::Status);
        let layout = handle.layout().await?;
        let snapshot = handle.snapshot().await?;

        let mut messages = MessageLog::new(self.config.messages.capacity);
        messages.info(format!("Welcome to PuG. Seed {}.", runtime.seed()));
        messages.info(awaiting_move(snapshot.turn));

        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop {
            handle,
            turn_rx,
            status_rx,
            notices_tx,
            notices_rx,
            layout,
            snapshot,
            messages,
            prompt: None,
        };

        let mut terminal = terminal::init()?;
        let _guard = terminal::TerminalGuard;
        let outcome = event_loop.run(&mut terminal).await;
        terminal::restore()?;

        runtime.shutdown().await?;
        tracing::info!("client exiting");
        outcome
    }
}

struct EventLoop {
    handle: RuntimeHandle,
    turn_rx: broadcast::Receiver<Event>,
    status_rx: broadcast::Receiver<Event>,
    notices_tx: mpsc::UnboundedSender<Notice>,
    notices_rx: mpsc::UnboundedReceiver<Notice>,
    layout: LevelLayout,
    snapshot: RenderSnapshot,
    messages: MessageLog,
    /// Enemy description being typed; keys go here while it is open.
    prompt: Option<String>,
}

impl EventLoop {
    async fn run(mut self, terminal: &mut terminal::Tui) -> Result<()> {
        self.draw(terminal)?;

        loop {
            let redraw = tokio::select! {
                result = self.turn_rx.recv() => match self.on_runtime_event(result).await? {
                    Some(redraw) => redraw,
                    None => break,
                },
                result = self.status_rx.recv() => match self.on_runtime_event(result).await? {
                    Some(redraw) => redraw,
                    None => break,
                },
                Some((text, level)) = self.notices_rx.recv() => {
                    self.messages.push(text, level);
                    true
                }
                _ = time::sleep(Duration::from_millis(FRAME_INTERVAL_MS)) => {
                    match self.on_input_tick()? {
                        Some(redraw) => redraw,
                        None => break,
                    }
                }
            };

            if redraw {
                self.draw(terminal)?;
            }
        }

        Ok(())
    }

    /// `None` when the event stream is gone and the loop should stop.
    async fn on_runtime_event(
        &mut self,
        result: Result<Event, RecvError>,
    ) -> Result<Option<bool>> {
        match result {
            Ok(event) => {
                if let Event::Turn(turn_event) = &event {
                    self.adopt_snapshot(turn_event);
                }
                self.messages.record(&event);
                Ok(Some(true))
            }
            Err(RecvError::Closed) => {
                tracing::warn!("event stream closed");
                Ok(None)
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "dropped stale events");
                self.snapshot = self.handle.snapshot().await?;
                Ok(Some(true))
            }
        }
    }

    fn adopt_snapshot(&mut self, event: &TurnEvent) {
        match event {
            TurnEvent::Committed { snapshot, .. }
            | TurnEvent::Rewound { snapshot }
            | TurnEvent::Reset { snapshot }
            | TurnEvent::Spawned { snapshot, .. }
            | TurnEvent::Despawned { snapshot, .. } => self.snapshot = snapshot.clone(),
            TurnEvent::AwaitingInput { .. } => {}
        }
    }

    /// `None` on quit, otherwise whether the frame needs a redraw.
    fn on_input_tick(&mut self) -> Result<Option<bool>> {
        if !term_event::poll(Duration::from_millis(0))? {
            return Ok(Some(false));
        }

        match term_event::read()? {
            TermEvent::Key(key) if key.kind == KeyEventKind::Press && self.prompt.is_some() => {
                self.on_prompt_edit(handle_prompt_key(key));
                Ok(Some(true))
            }
            TermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                let action = handle_key(key);
                tracing::debug!(?action, "key pressed");
                Ok(self.on_key_action(action).then_some(true))
            }
            TermEvent::Resize(_, _) => Ok(Some(true)),
            _ => Ok(Some(false)),
        }
    }

    /// False on quit.
    fn on_key_action(&mut self, action: KeyAction) -> bool {
        let handle = self.handle.clone();
        match action {
            KeyAction::Quit => return false,
            KeyAction::Play(input) => self.dispatch(async move {
                match handle.submit_input(input).await {
                    Ok(_) => None,
                    // Aborted turns are reported on the status topic.
                    Err(RuntimeError::Turn(_)) => None,
                    Err(err) => Some(failure("Turn failed", err)),
                }
            }),
            KeyAction::Undo => self.dispatch(async move {
                match handle.undo().await {
                    Ok(Some(_)) => None,
                    Ok(None) => Some(("Nothing to undo.".to_owned(), MessageLevel::Info)),
                    Err(err) => Some(failure("Undo failed", err)),
                }
            }),
            KeyAction::Reset => self.dispatch(async move {
                handle.reset().await.err().map(|err| failure("Reset failed", err))
            }),
            KeyAction::SpawnRoach => self.spawn_enemy(SpawnSpec::roach(default_spawn())),
            KeyAction::SpawnRoachMother => {
                self.spawn_enemy(SpawnSpec::roach_mother(default_spawn()))
            }
            KeyAction::OpenPrompt => self.prompt = Some(String::new()),
            KeyAction::None => {}
        }
        true
    }

    fn on_prompt_edit(&mut self, edit: PromptEdit) {
        let Some(text) = self.prompt.as_mut() else {
            return;
        };
        match edit {
            PromptEdit::Insert(c) => text.push(c),
            PromptEdit::Backspace => {
                text.pop();
            }
            PromptEdit::Cancel => self.prompt = None,
            PromptEdit::Submit => {
                let description = self.prompt.take().unwrap_or_default();
                if description.trim().is_empty() {
                    return;
                }
                let handle = self.handle.clone();
                self.dispatch(async move {
                    match handle.spawn_from_prompt(description).await {
                        Ok(_) => None,
                        // Generation failures are reported on the status topic.
                        Err(RuntimeError::Generation(_) | RuntimeError::GeneratorNotConfigured) => {
                            None
                        }
                        Err(err) => Some(failure("Spawn failed", err)),
                    }
                });
            }
            PromptEdit::None => {}
        }
    }

    fn spawn_enemy(&self, spec: SpawnSpec) {
        let handle = self.handle.clone();
        self.dispatch(async move {
            handle.spawn(spec).await.err().map(|err| failure("Spawn failed", err))
        });
    }

    /// Runs a runtime command on its own task; its notice, if any, lands in
    /// the message log.
    fn dispatch<F>(&self, command: F)
    where
        F: Future<Output = Option<Notice>> + Send + 'static,
    {
        let notices = self.notices_tx.clone();
        tokio::spawn(async move {
            if let Some(notice) = command.await {
                let _ = notices.send(notice);
            }
        });
    }

    fn draw(&self, terminal: &mut terminal::Tui) -> Result<()> {
        let view = View {
            snapshot: &self.snapshot,
            layout: &self.layout,
            messages: &self.messages,
            awaiting_input: self.handle.is_awaiting_input(),
            prompt: self.prompt.as_deref(),
        };
        ui::render(terminal, &view)
    }
}

fn default_spawn() -> Position {
    let (x, y) = GameConfig::DEFAULT_SPAWN;
    Position::new(x, y)
}

fn failure(what: &str, err: RuntimeError) -> Notice {
    tracing::warn!(error = %err, "{what}");
    (format!("{what}: {err}."), MessageLevel::Error)
}
