//! Undo history.
use std::collections::VecDeque;

use crate::state::Entity;

/// Entity list as it was before a committed turn.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryEntry {
    /// Turn counter before the turn was committed.
    pub turn: u64,
    pub entities: Vec<Entity>,
}

/// Stack of pre-turn snapshots. With a capacity it behaves as a ring buffer
/// that forgets the oldest entry.
#[derive(Clone, Debug, Default)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
    capacity: Option<usize>,
}

impl HistoryLedger {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == Some(0) {
            return;
        }
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
    }

    /// Pops the most recent entry.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
