use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use anyhow::Result;
use crate::action::Action;

pub fn poll_event(timeout: Duration, in_input: bool) -> Result<Option<Action>> {
    if event::poll(timeout)? {
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if in_input { translate_input_key(key) } else { translate_key(key) }
            }
            _ => Action::None,
        };
        Ok(Some(action))
    } else {
        Ok(None)
    }
}

/// Input mode: only special keys are translated; all chars go to the buffer.
pub fn translate_input_key(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::Select,
        KeyCode::Esc => Action::Cancel,
        KeyCode::Backspace => Action::InputBackspace,
        KeyCode::Left => Action::InputLeft,
        KeyCode::Right => Action::InputRight,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Cancel,
        KeyCode::Char(c) => Action::InputChar(c),
        _ => Action::None,
    }
}

/// Normal mode: chars are commands.
pub fn translate_key(key: KeyEvent) -> Action {
    match (key.modifiers, key.code) {
        (KeyModifiers::NONE, KeyCode::Char('q')) => Action::Quit,
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Action::Quit,
        (KeyModifiers::NONE, KeyCode::Char('j')) | (KeyModifiers::NONE, KeyCode::Down) => Action::NavigateDown,
        (KeyModifiers::NONE, KeyCode::Char('k')) | (KeyModifiers::NONE, KeyCode::Up) => Action::NavigateUp,
        (KeyModifiers::NONE, KeyCode::Right) => Action::AttachDefault,
        (KeyModifiers::NONE, KeyCode::Enter) => Action::Select,
        (KeyModifiers::NONE, KeyCode::Char('l')) => Action::Refresh,
        (KeyModifiers::NONE, KeyCode::Char('p')) => Action::MessagePm,
        (KeyModifiers::NONE, KeyCode::Char('r')) => Action::ReviewLoop,
        (KeyModifiers::NONE, KeyCode::Char('w')) => Action::RequestReview,
        (KeyModifiers::NONE, KeyCode::Char('s')) => Action::MessageWorktree,
        (KeyModifiers::NONE, KeyCode::Char('c')) => Action::Cleanup,
        (KeyModifiers::NONE, KeyCode::Char('/')) => Action::Filter,
        (KeyModifiers::NONE, KeyCode::Char('?')) | (KeyModifiers::SHIFT, KeyCode::Char('?')) => Action::Help,
        (KeyModifiers::NONE, KeyCode::Char('y')) => Action::ConfirmYes,
        (KeyModifiers::NONE, KeyCode::Char('n')) => Action::ConfirmNo,
        (KeyModifiers::NONE, KeyCode::Char(c)) if c.is_ascii_digit() => {
            Action::MenuDigit(c as u8 - b'0')
        }
        (KeyModifiers::NONE, KeyCode::Esc) => Action::Cancel,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn normal_mode_maps_commands_and_digits() {
        assert_eq!(translate_key(key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(translate_key(key(KeyCode::Char('l'))), Action::Refresh);
        assert_eq!(translate_key(key(KeyCode::Right)), Action::AttachDefault);
        assert_eq!(translate_key(key(KeyCode::Char('/'))), Action::Filter);
        assert_eq!(translate_key(key(KeyCode::Char('3'))), Action::MenuDigit(3));
        assert_eq!(translate_key(key(KeyCode::Esc)), Action::Cancel);
        assert_eq!(translate_key(key(KeyCode::Char('z'))), Action::None);
    }

    #[test]
    fn input_mode_sends_chars_to_buffer() {
        assert_eq!(translate_input_key(key(KeyCode::Char('q'))), Action::InputChar('q'));
        assert_eq!(translate_input_key(key(KeyCode::Char('3'))), Action::InputChar('3'));
        assert_eq!(translate_input_key(key(KeyCode::Enter)), Action::Select);
        assert_eq!(translate_input_key(key(KeyCode::Esc)), Action::Cancel);
        assert_eq!(
            translate_input_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Cancel
        );
    }
}
