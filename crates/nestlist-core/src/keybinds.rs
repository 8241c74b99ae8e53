use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Input modes, modeled after vim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Default mode. Navigation and actions via keybinds.
    #[default]
    Normal,
    /// Text input mode, active while a prompt dialog is open.
    Insert,
    /// A confirmation dialog is waiting for y/n.
    Confirm,
}

impl InputMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Insert => "INSERT",
            Self::Confirm => "CONFIRM",
        }
    }
}

/// Actions that can result from processing a key event in Normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// No-op, the key was consumed but nothing happens.
    None,
    /// Quit the application.
    Quit,
    /// Move selection down by N items.
    MoveDown(usize),
    /// Move selection up by N items.
    MoveUp(usize),
    /// Jump to top of list.
    GotoTop,
    /// Jump to bottom of list.
    GotoBottom,
    /// Half-page down.
    HalfPageDown,
    /// Half-page up.
    HalfPageUp,
    /// Begin adding a child under the current item.
    Add,
    /// Begin removing the current item.
    Delete,
}

/// Pending key state for multi-key sequences like `gg`.
#[derive(Debug, Default, Clone)]
pub struct KeyState {
    /// Pending first key of a two-key sequence (e.g., 'g' for gg).
    pub pending_key: Option<char>,
}

/// Process a key event in Normal mode, accounting for multi-key sequences.
pub fn process_normal_key(key: KeyEvent, state: &mut KeyState) -> Action {
    if let Some(pending) = state.pending_key.take() {
        return match (pending, key.code) {
            ('g', KeyCode::Char('g')) => Action::GotoTop,
            _ => Action::None, // Invalid sequence, ignore
        };
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown(1),
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp(1),
        KeyCode::Char('G') => Action::GotoBottom,
        KeyCode::Char('g') => {
            state.pending_key = Some('g');
            Action::None
        }
        KeyCode::Char('d') if key.modifiers == KeyModifiers::CONTROL => Action::HalfPageDown,
        KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => Action::HalfPageUp,
        KeyCode::Char('d') | KeyCode::Char('x') | KeyCode::Delete => Action::Delete,
        KeyCode::Char('a') | KeyCode::Char('o') => Action::Add,
        KeyCode::Char('q') => Action::Quit,
        _ => Action::None,
    }
}
