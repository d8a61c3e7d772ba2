//! Message input box
//!
//! Holds the draft text plus the enabled/focused flags the exchange
//! state machine toggles. Also classifies keystrokes (Enter submits,
//! modified Enter breaks the line) and computes how many rows the box
//! needs for its content.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthStr;

/// Rows the input box may grow to before it scrolls
pub const MAX_INPUT_ROWS: u16 = 6;

/// What a keystroke asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    Submit,
    Refresh,
    Quit,
    Edited,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct InputBox {
    text: String,
    enabled: bool,
    focused: bool,
}

impl Default for InputBox {
    fn default() -> Self {
        Self {
            text: String::new(),
            enabled: true,
            focused: true,
        }
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Take the draft and lock the box in one step
    pub fn take_and_disable(&mut self) -> String {
        self.enabled = false;
        self.focused = false;
        std::mem::take(&mut self.text)
    }

    pub fn enable_and_focus(&mut self) {
        self.enabled = true;
        self.focused = true;
    }

    /// Apply a keystroke. Editing keys are swallowed while disabled.
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyIntent {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => return KeyIntent::Quit,
            KeyCode::Char('c') if ctrl => return KeyIntent::Quit,
            KeyCode::Char('r') if ctrl => return KeyIntent::Refresh,
            _ => {}
        }

        if !self.enabled {
            return KeyIntent::Ignored;
        }

        match key.code {
            KeyCode::Enter if key.modifiers.is_empty() => KeyIntent::Submit,
            KeyCode::Char('s') if ctrl => KeyIntent::Submit,
            // Any modified Enter is a soft line break
            KeyCode::Enter => {
                self.text.push('\n');
                KeyIntent::Edited
            }
            KeyCode::Char(c) if !ctrl => {
                self.text.push(c);
                KeyIntent::Edited
            }
            KeyCode::Backspace => {
                self.text.pop();
                KeyIntent::Edited
            }
            _ => KeyIntent::Ignored,
        }
    }

    /// Rows needed to show the draft at `width` columns, clamped to
    /// 1..=MAX_INPUT_ROWS
    pub fn desired_rows(&self, width: u16) -> u16 {
        let width = usize::from(width.max(1));
        let rows: usize = self
            .text
            .split('\n')
            .map(|line| line.width().max(1).div_ceil(width))
            .sum();
        (rows.max(1) as u16).min(MAX_INPUT_ROWS)
    }
}

/// Classify a keystroke while the refresh overlay covers the view.
/// Only a hard quit gets through; the draft is never touched.
pub fn overlay_intent(key: KeyEvent) -> KeyIntent {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyIntent::Quit,
        _ => KeyIntent::Ignored,
    }
}
