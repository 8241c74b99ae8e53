use crate::ui::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

/// What kind of answer the dialog asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    /// Free-text input, submitted with Enter.
    Prompt,
    /// Yes/no confirmation.
    Confirm,
}

/// Result of feeding one key to an open dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Still open, waiting for more input.
    Pending,
    /// Prompt submitted with this (untrimmed) text.
    Submitted(String),
    /// Confirmation accepted.
    Confirmed,
    /// Closed without an answer.
    Cancelled,
}

/// A modal prompt/confirm overlay. While open it swallows every key.
#[derive(Debug, Clone)]
pub struct Dialog {
    kind: DialogKind,
    title: String,
    body: Vec<String>,
    input_buffer: String,
    input_cursor: usize,
}

impl Dialog {
    pub fn prompt(title: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Prompt,
            title: title.into(),
            body: Vec::new(),
            input_buffer: String::new(),
            input_cursor: 0,
        }
    }

    pub fn confirm(title: impl Into<String>, body: Vec<String>) -> Self {
        Self {
            kind: DialogKind::Confirm,
            title: title.into(),
            body,
            input_buffer: String::new(),
            input_cursor: 0,
        }
    }

    pub fn input(&self) -> &str {
        &self.input_buffer
    }

    /// Feed a key to the dialog.
    pub fn handle_key(&mut self, key: KeyEvent) -> DialogOutcome {
        if key.code == KeyCode::Esc {
            return DialogOutcome::Cancelled;
        }
        match self.kind {
            DialogKind::Prompt => match key.code {
                KeyCode::Enter => DialogOutcome::Submitted(self.input_buffer.clone()),
                KeyCode::Char(c) => {
                    self.input_insert_char(c);
                    DialogOutcome::Pending
                }
                KeyCode::Backspace => {
                    self.input_backspace();
                    DialogOutcome::Pending
                }
                KeyCode::Left => {
                    self.input_cursor_left();
                    DialogOutcome::Pending
                }
                KeyCode::Right => {
                    self.input_cursor_right();
                    DialogOutcome::Pending
                }
                _ => DialogOutcome::Pending,
            },
            DialogKind::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    DialogOutcome::Confirmed
                }
                _ => DialogOutcome::Cancelled,
            },
        }
    }

    /// Insert a character into the input buffer at the cursor position.
    pub fn input_insert_char(&mut self, c: char) {
        self.input_buffer.insert(self.input_cursor, c);
        self.input_cursor += c.len_utf8();
    }

    /// Delete the character before the cursor in the input buffer.
    pub fn input_backspace(&mut self) {
        if self.input_cursor > 0 {
            let prev = self.input_buffer[..self.input_cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input_buffer.drain(prev..self.input_cursor);
            self.input_cursor = prev;
        }
    }

    /// Move cursor left in the input buffer.
    pub fn input_cursor_left(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor = self.input_buffer[..self.input_cursor]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    /// Move cursor right in the input buffer.
    pub fn input_cursor_right(&mut self) {
        if self.input_cursor < self.input_buffer.len() {
            self.input_cursor = self.input_buffer[self.input_cursor..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.input_cursor + i)
                .unwrap_or(self.input_buffer.len());
        }
    }

    /// Render the dialog centered on screen, clearing what is behind it.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = self
            .body
            .iter()
            .map(|l| Line::from(Span::raw(l.clone())))
            .collect();

        let footer = match self.kind {
            DialogKind::Prompt => "Enter: submit  Esc: cancel",
            DialogKind::Confirm => "y: confirm  n/Esc: cancel",
        };
        if self.kind == DialogKind::Prompt {
            lines.push(Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::raw(self.input_buffer.clone()),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            footer,
            Style::default().fg(Color::DarkGray),
        )));

        let popup_width = area.width.saturating_sub(8).min(60);
        let popup_height = lines.len() as u16 + 2;
        let popup_area = centered_rect(popup_width, popup_height, area);

        frame.render_widget(Clear, popup_area);

        let border = match self.kind {
            DialogKind::Prompt => Color::Blue,
            DialogKind::Confirm => Color::Red,
        };
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));
        let inner = block.inner(popup_area);

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup_area);

        if self.kind == DialogKind::Prompt && inner.height > 0 {
            let typed = self.input_buffer[..self.input_cursor].width() as u16;
            let cursor_x = inner.x + 2 + typed;
            let cursor_y = inner.y + self.body.len() as u16;
            if cursor_x < inner.x + inner.width && cursor_y < inner.y + inner.height {
                frame.set_cursor_position((cursor_x, cursor_y));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_prompt_submits_typed_text() {
        let mut dialog = Dialog::prompt("Add new item");
        for c in "hi".chars() {
            assert_eq!(dialog.handle_key(press(KeyCode::Char(c))), DialogOutcome::Pending);
        }
        assert_eq!(
            dialog.handle_key(press(KeyCode::Enter)),
            DialogOutcome::Submitted("hi".to_string())
        );
    }

    #[test]
    fn test_escape_cancels_both_kinds() {
        let mut prompt = Dialog::prompt("Add new item");
        prompt.handle_key(press(KeyCode::Char('x')));
        assert_eq!(prompt.handle_key(press(KeyCode::Esc)), DialogOutcome::Cancelled);

        let mut confirm = Dialog::confirm("Delete Item", vec![]);
        assert_eq!(confirm.handle_key(press(KeyCode::Esc)), DialogOutcome::Cancelled);
    }

    #[test]
    fn test_confirm_accepts_y_and_rejects_other_keys() {
        let mut confirm = Dialog::confirm("Delete Item", vec![]);
        assert_eq!(confirm.handle_key(press(KeyCode::Char('y'))), DialogOutcome::Confirmed);
        assert_eq!(confirm.handle_key(press(KeyCode::Char('n'))), DialogOutcome::Cancelled);
    }

    #[test]
    fn test_input_buffer_operations() {
        let mut dialog = Dialog::prompt("t");

        for c in "hello".chars() {
            dialog.input_insert_char(c);
        }
        assert_eq!(dialog.input(), "hello");
        assert_eq!(dialog.input_cursor, 5);

        dialog.input_backspace();
        assert_eq!(dialog.input(), "hell");
        assert_eq!(dialog.input_cursor, 4);

        dialog.input_cursor_left();
        assert_eq!(dialog.input_cursor, 3);

        dialog.input_insert_char('X');
        assert_eq!(dialog.input(), "helXl");
        assert_eq!(dialog.input_cursor, 4);

        dialog.input_cursor_right();
        assert_eq!(dialog.input_cursor, 5);
    }

    #[test]
    fn test_multibyte_backspace() {
        let mut dialog = Dialog::prompt("t");
        dialog.input_insert_char('é');
        dialog.input_insert_char('ß');
        dialog.input_backspace();
        assert_eq!(dialog.input(), "é");
        assert_eq!(dialog.input_cursor, 'é'.len_utf8());
    }
}
