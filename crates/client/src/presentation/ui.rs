//! Frame layout and drawing with ratatui.
//!
//! Everything drawn comes from the committed [`RenderSnapshot`]; the map is
//! never drawn from mid-turn state.
use anyhow::Result;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListDirection, ListItem, Paragraph},
};

use pug_core::{EntityKind, GameConfig, LevelLayout, Position, RenderSnapshot};
use pug_runtime::api::token_for;

use super::messages::{MessageEntry, MessageLevel, MessageLog};
use super::terminal::Tui;

pub const MESSAGE_PANEL_HEIGHT: u16 = 7;

/// Everything one frame needs.
pub struct View<'a> {
    pub snapshot: &'a RenderSnapshot,
    pub layout: &'a LevelLayout,
    pub messages: &'a MessageLog,
    pub awaiting_input: bool,
    /// Text typed so far when the enemy prompt is open.
    pub prompt: Option<&'a str>,
}

pub fn render(terminal: &mut Tui, view: &View<'_>) -> Result<()> {
    terminal.draw(|frame| render_frame(frame, view))?;
    Ok(())
}

fn render_frame(frame: &mut Frame, view: &View<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(MESSAGE_PANEL_HEIGHT),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], view);
    render_map(frame, chunks[1], view.snapshot, view.layout);
    render_messages(frame, chunks[2], view.messages);
    match view.prompt {
        Some(text) => render_prompt(frame, chunks[3], text),
        None => render_footer(frame, chunks[3]),
    }
}

fn render_header(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let status = if view.awaiting_input {
        Span::styled("your move", Style::default().fg(Color::Green))
    } else {
        Span::styled("enemies moving...", Style::default().fg(Color::Yellow))
    };
    let enemies = view
        .snapshot
        .entities
        .iter()
        .filter(|entity| entity.kind != EntityKind::Player)
        .count();

    let line = Line::from(vec![
        Span::styled("PuG", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  turn {}  enemies {}  ", view.snapshot.turn, enemies)),
        status,
    ]);
    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_map(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot, layout: &LevelLayout) {
    let rows: Vec<Line> = (0..snapshot.height as i32)
        .map(|y| {
            let spans = (0..snapshot.width as i32)
                .flat_map(|x| {
                    let (glyph, style) = glyph_for_cell(snapshot, layout, Position::new(x, y));
                    [Span::styled(glyph.to_string(), style), Span::raw(" ")]
                })
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect();

    let paragraph = Paragraph::new(rows).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Map ({}×{})", snapshot.width, snapshot.height)),
    );
    frame.render_widget(paragraph, area);
}

fn glyph_for_cell(
    snapshot: &RenderSnapshot,
    layout: &LevelLayout,
    position: Position,
) -> (char, Style) {
    if let Some(kind) = snapshot.kind_at(position) {
        let style = Style::default()
            .fg(kind_color(kind))
            .add_modifier(Modifier::BOLD);
        return (token_for(kind), style);
    }
    if layout.is_wall(position) {
        return ('#', Style::default().fg(Color::DarkGray));
    }
    (terrain_glyph(layout.terrain().get(position)), terrain_style(layout, position))
}

fn kind_color(kind: EntityKind) -> Color {
    match kind {
        EntityKind::Player => Color::Yellow,
        EntityKind::Seeker => Color::LightRed,
        EntityKind::Fleer => Color::Magenta,
        EntityKind::External => Color::Cyan,
    }
}

fn terrain_glyph(code: Option<i32>) -> char {
    match code {
        Some(code) if code == GameConfig::TERRAIN_CODES[2] => '"',
        Some(code) if code == GameConfig::TERRAIN_CODES[1] => ',',
        _ => '.',
    }
}

fn terrain_style(layout: &LevelLayout, position: Position) -> Style {
    let color = match layout.terrain().get(position) {
        Some(code) if code == GameConfig::TERRAIN_CODES[2] => Color::LightGreen,
        Some(code) if code == GameConfig::TERRAIN_CODES[1] => Color::Green,
        _ => Color::Gray,
    };
    Style::default().fg(color)
}

fn render_messages(frame: &mut Frame, area: Rect, messages: &MessageLog) {
    let visible = MESSAGE_PANEL_HEIGHT.saturating_sub(2) as usize;
    let mut items: Vec<ListItem> = messages
        .recent(visible)
        .map(|entry| ListItem::new(format_message(entry)).style(style_for_level(entry.level)))
        .collect();

    while items.len() < visible {
        items.push(ListItem::new(""));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Messages"))
        .direction(ListDirection::BottomToTop);
    frame.render_widget(list, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::raw("[Arrows/WASD] Move | "),
        Span::raw("[Numpad] 8-way, 5 skip | "),
        Span::raw("[Space] Skip | "),
        Span::raw("[z] Undo | "),
        Span::raw("[r] Reset | "),
        Span::raw("[+/m] Spawn | "),
        Span::raw("[e] Describe enemy | "),
        Span::raw("[q] Quit"),
    ]);
    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_prompt(frame: &mut Frame, area: Rect, text: &str) {
    let line = Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan)),
        Span::raw(text),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]);
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Add enemy ([Enter] spawn, [Esc] cancel)"),
    );
    frame.render_widget(paragraph, area);
}

fn format_message(entry: &MessageEntry) -> String {
    format!("[{}] {}", entry.timestamp, entry.text)
}

fn style_for_level(level: MessageLevel) -> Style {
    match level {
        MessageLevel::Info => Style::default(),
        MessageLevel::Warning => Style::default().fg(Color::Yellow),
        MessageLevel::Error => Style::default().fg(Color::Red),
    }
}
