// Single-line input box with cursor movement and unicode support.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};
use crate::ui::popup_upper;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    pub buffer: String,
    pub cursor: usize, // byte offset
    pub prompt: String,
}

impl InputState {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self::with_value(prompt, String::new())
    }

    pub fn with_value(prompt: impl Into<String>, value: String) -> Self {
        let cursor = value.len();
        Self { buffer: value, cursor, prompt: prompt.into() }
    }

    pub fn insert_char(&mut self, c: char) {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let prev = self.prev_boundary();
            self.buffer.drain(prev..self.cursor);
            self.cursor = prev;
        }
    }

    pub fn cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.prev_boundary();
        }
    }

    pub fn cursor_right(&mut self) {
        if let Some(c) = self.buffer[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn value(&self) -> &str {
        &self.buffer
    }

    fn prev_boundary(&self) -> usize {
        self.buffer[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn display_cursor(&self) -> usize {
        self.buffer[..self.cursor].chars().count()
    }
}

pub fn render_input(frame: &mut Frame, area: Rect, state: &InputState, title: &str) {
    let width = area.width.min(60);
    let popup = popup_upper(area, width, 3);

    frame.render_widget(Clear, popup);

    let display = format!("{}{}", state.prompt, state.buffer);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .border_style(Style::default().fg(Color::Cyan));
    let para = Paragraph::new(display).block(block);
    frame.render_widget(para, popup);

    let cursor_col = state.prompt.chars().count() + state.display_cursor();
    let cursor_x = popup.x + 1 + cursor_col as u16;
    frame.set_cursor_position((cursor_x.min(popup.x + popup.width.saturating_sub(2)), popup.y + 1));
}
