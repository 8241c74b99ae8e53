use crate::keybinds::InputMode;
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Render the bottom status bar showing the current mode and optional info.
/// `error` is shown in red after the info text when present.
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    mode: InputMode,
    title: &str,
    info: &str,
    error: Option<&str>,
) {
    let mode_style = Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED);

    let mut spans = vec![
        Span::styled(format!(" {} ", mode.label()), mode_style),
        Span::raw(" "),
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(info, Style::default().add_modifier(Modifier::DIM)),
    ];
    if let Some(err) = error {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            err,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let bar = Paragraph::new(Line::from(spans)).style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(bar, area);
}

/// Standard layout: main content + status bar (1 line).
/// Returns (content_area, status_area).
pub fn standard_layout(area: Rect) -> (Rect, Rect) {
    let [content_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);

    (content_area, status_area)
}

/// Create a standard bordered block for a view.
pub fn tool_block(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::DIM))
}

/// A rect of the given size centered inside `area`, clamped to fit.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height.min(area.height))]).flex(Flex::Center);
    let horizontal =
        Layout::horizontal([Constraint::Length(width.min(area.width))]).flex(Flex::Center);
    let [popup] = vertical.areas(area);
    let [popup] = horizontal.areas(popup);
    popup
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 80, 24);
        let popup = centered_rect(40, 10, area);
        assert_eq!(popup.width, 40);
        assert_eq!(popup.height, 10);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 7);
    }

    #[test]
    fn test_centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 5);
        let popup = centered_rect(40, 10, area);
        assert_eq!(popup, area);
    }
}
