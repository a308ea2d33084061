//! Message log shown under the map, fed from runtime events.
use std::collections::VecDeque;

use pug_runtime::{Event, StatusEvent, TurnEvent};

/// Severity level for UI messages produced from runtime events.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug)]
pub struct MessageEntry {
    pub text: String,
    /// Wall-clock time, `HH:MM:SS`.
    pub timestamp: String,
    pub level: MessageLevel,
}

/// Bounded buffer of messages; the oldest entry is dropped when full.
#[derive(Clone, Debug)]
pub struct MessageLog {
    entries: VecDeque<MessageEntry>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, text: impl Into<String>, level: MessageLevel) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(MessageEntry {
            text: text.into(),
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(text, MessageLevel::Info);
    }

    /// Records the player-facing line for a runtime event, if it has one.
    pub fn record(&mut self, event: &Event) {
        if let Some((text, level)) = describe(event) {
            self.push(text, level);
        }
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &MessageEntry> {
        self.entries.iter().rev().take(limit)
    }
}

pub fn awaiting_move(turn: u64) -> String {
    format!("Turn {turn}. Awaiting player move (arrows/WASD/numpad).")
}

fn describe(event: &Event) -> Option<(String, MessageLevel)> {
    use MessageLevel::{Error, Info, Warning};

    let line = match event {
        Event::Turn(TurnEvent::AwaitingInput { turn }) => (awaiting_move(*turn), Info),
        Event::Turn(TurnEvent::Committed { summary, .. }) => {
            let blocked = summary.rejections().count();
            if blocked == 0 {
                return None;
            }
            (format!("{blocked} enemy move(s) blocked."), Info)
        }
        Event::Turn(TurnEvent::Rewound { snapshot }) => {
            (format!("Undid one turn, back to turn {}.", snapshot.turn), Info)
        }
        Event::Turn(TurnEvent::Reset { .. }) => ("Level reset.".to_owned(), Info),
        Event::Turn(TurnEvent::Spawned { name, position, .. }) => {
            (format!("{name} appears at {position}."), Info)
        }
        Event::Turn(TurnEvent::Despawned { id, .. }) => (format!("Entity {id} removed."), Info),
        Event::Status(StatusEvent::BackendUnavailable {
            entity, backend, ..
        }) => (
            format!("Backend {backend} did not answer for entity {entity}; it stays put."),
            Warning,
        ),
        Event::Status(StatusEvent::MalformedReply {
            entity, backend, ..
        }) => (
            format!("Backend {backend} sent an unreadable move for entity {entity}; it stays put."),
            Warning,
        ),
        Event::Status(StatusEvent::TurnAborted { error, .. }) => {
            (format!("Turn aborted: {error}."), Error)
        }
        Event::Status(StatusEvent::InputIgnored) => {
            ("Still resolving the last turn; input ignored.".to_owned(), Warning)
        }
        Event::Status(StatusEvent::GenerationFailed { reason, .. }) => {
            (format!("Could not create that enemy: {reason}."), Error)
        }
    };
    Some(line)
}
