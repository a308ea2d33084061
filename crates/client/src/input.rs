//! Input processing for the terminal client.
//!
//! Owns the keyboard-to-command mapping so the event loop never looks at
//! concrete key bindings.
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use pug_core::{Direction, PlayerInput};

/// High-level outcome of processing a keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Exit the application.
    Quit,
    /// Play one turn.
    Play(PlayerInput),
    Undo,
    Reset,
    SpawnRoach,
    SpawnRoachMother,
    /// Start typing a free-text enemy description.
    OpenPrompt,
    /// No meaningful command was produced.
    None,
}

/// Keyboard effect while the enemy prompt is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptEdit {
    Insert(char),
    Backspace,
    Submit,
    Cancel,
    None,
}

/// Converts a raw key event into a command.
///
/// Arrows and WASD move orthogonally. Digits follow the numeric keypad
/// layout (7 8 9 / 4 5 6 / 1 2 3) and reach diagonals; 5 and space skip.
pub fn handle_key(key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => KeyAction::Quit,
            _ => KeyAction::None,
        };
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => step(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => step(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => step(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => step(Direction::Right),

        KeyCode::Char('7') => step(Direction::UpLeft),
        KeyCode::Char('8') => step(Direction::Up),
        KeyCode::Char('9') => step(Direction::UpRight),
        KeyCode::Char('4') => step(Direction::Left),
        KeyCode::Char('6') => step(Direction::Right),
        KeyCode::Char('1') => step(Direction::DownLeft),
        KeyCode::Char('2') => step(Direction::Down),
        KeyCode::Char('3') => step(Direction::DownRight),
        KeyCode::Char('5') | KeyCode::Char(' ') => KeyAction::Play(PlayerInput::Skip),

        KeyCode::Char('z') | KeyCode::Char('Z') => KeyAction::Undo,
        KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Reset,
        KeyCode::Char('+') => KeyAction::SpawnRoach,
        KeyCode::Char('m') | KeyCode::Char('M') => KeyAction::SpawnRoachMother,
        KeyCode::Char('e') | KeyCode::Char('E') => KeyAction::OpenPrompt,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,

        _ => KeyAction::None,
    }
}

/// Line editing for the enemy prompt. Every printable key is text here.
pub fn handle_prompt_key(key: KeyEvent) -> PromptEdit {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => PromptEdit::Cancel,
            _ => PromptEdit::None,
        };
    }

    match key.code {
        KeyCode::Enter => PromptEdit::Submit,
        KeyCode::Esc => PromptEdit::Cancel,
        KeyCode::Backspace => PromptEdit::Backspace,
        KeyCode::Char(c) => PromptEdit::Insert(c),
        _ => PromptEdit::None,
    }
}

fn step(direction: Direction) -> KeyAction {
    KeyAction::Play(PlayerInput::Step(direction))
}
