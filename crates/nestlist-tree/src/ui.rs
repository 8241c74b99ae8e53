use crate::model::{Node, NodeId};
use crate::walk::{connector_offset, indent_width, walk};
use nestlist_core::ui::tool_block;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::UnicodeWidthStr;

/// Width of the "Add Child" column.
pub const ADD_COLUMN_WIDTH: u16 = 12;
/// Width of the "Remove" column.
pub const REMOVE_COLUMN_WIDTH: u16 = 10;

const CONNECTOR: &str = "\u{2514}\u{2500}";
const CONNECTOR_STYLE: Style = Style::new().fg(Color::DarkGray);
const SELECTED_BG: Color = Color::Gray;

// ── Rows ─────────────────────────────────────────────────────────────

/// One visible line of the tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: NodeId,
    pub name: String,
    pub depth: usize,
    /// `None` for the root, which has no remove affordance.
    pub parent: Option<NodeId>,
}

/// Flatten `root` into display rows, in pre-order.
pub fn build_rows(root: &Node) -> Vec<Row> {
    walk(root)
        .map(|v| Row {
            id: v.node.id.clone(),
            name: v.node.name.clone(),
            depth: v.depth,
            parent: v.parent.map(|p| p.id.clone()),
        })
        .collect()
}

/// Indentation and connector drawn before a row's name.
pub fn row_prefix(depth: usize) -> String {
    let indent = indent_width(depth) as usize;
    match connector_offset(depth) {
        None => " ".repeat(indent),
        Some(offset) => {
            let mut prefix = " ".repeat(offset as usize);
            prefix.push_str(CONNECTOR);
            let used = prefix.width();
            prefix.push_str(&" ".repeat(indent.saturating_sub(used)));
            prefix
        }
    }
}

// ── Rendering ────────────────────────────────────────────────────────

/// Render the tree view: header, then one line per row.
pub fn render_tree_view(frame: &mut Frame, area: Rect, rows: &[Row], selected: usize, loaded: bool) {
    let block = tool_block("Nested List");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if !loaded {
        let loading = Paragraph::new("Loading...")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        let y = inner.y + inner.height / 2;
        frame.render_widget(loading, Rect { y, height: 1, ..inner });
        return;
    }

    let [header_area, list_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);
    let name_width = inner
        .width
        .saturating_sub(ADD_COLUMN_WIDTH + REMOVE_COLUMN_WIDTH) as usize;

    frame.render_widget(Paragraph::new(header_line(name_width)), header_area);

    let visible_lines = list_area.height as usize;
    let scroll_offset = if selected >= visible_lines {
        selected + 1 - visible_lines
    } else {
        0
    };

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_lines)
        .map(|(idx, row)| row_line(row, idx == selected, name_width, inner.width))
        .collect();

    frame.render_widget(Paragraph::new(lines), list_area);
}

fn header_line(name_width: usize) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    Line::from(vec![
        Span::styled(pad("Name", name_width), bold),
        Span::styled(pad("Add Child", ADD_COLUMN_WIDTH as usize), bold),
        Span::styled(pad("Remove", REMOVE_COLUMN_WIDTH as usize), bold),
    ])
}

fn row_line(row: &Row, is_selected: bool, name_width: usize, total_width: u16) -> Line<'static> {
    let base_style = if is_selected {
        Style::default()
            .bg(SELECTED_BG)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    };
    let connector_style = if is_selected {
        CONNECTOR_STYLE.bg(SELECTED_BG)
    } else {
        CONNECTOR_STYLE
    };

    let prefix = row_prefix(row.depth);
    let name_room = name_width.saturating_sub(prefix.width());
    let name = truncate(&row.name, name_room);

    let mut spans = vec![
        Span::styled(prefix, connector_style),
        Span::styled(pad(&name, name_room), base_style),
        Span::styled(
            pad("[+] add", ADD_COLUMN_WIDTH as usize),
            base_style.fg(if is_selected { Color::Blue } else { Color::Cyan }),
        ),
    ];
    if row.parent.is_some() {
        spans.push(Span::styled(
            pad("[x] remove", REMOVE_COLUMN_WIDTH as usize),
            base_style.fg(Color::Red),
        ));
    }

    if is_selected {
        let content_width: usize = spans.iter().map(|s| s.content.width()).sum();
        let remaining = (total_width as usize).saturating_sub(content_width);
        if remaining > 0 {
            spans.push(Span::styled(
                " ".repeat(remaining),
                Style::default().bg(SELECTED_BG),
            ));
        }
    }

    Line::from(spans)
}

/// Right-pad `s` with spaces to `width` display cells.
fn pad(s: &str, width: usize) -> String {
    let mut out = s.to_string();
    out.push_str(&" ".repeat(width.saturating_sub(s.width())));
    out
}

/// Cut `s` to at most `width` display cells, marking the cut with an ellipsis.
fn truncate(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    if width > 0 {
        out.push('\u{2026}');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_root_has_no_prefix() {
        assert_eq!(row_prefix(0), "");
    }

    #[test]
    fn test_prefix_places_connector_by_depth() {
        assert_eq!(row_prefix(1), " \u{2514}\u{2500} ");
        assert_eq!(row_prefix(2), "     \u{2514}\u{2500} ");
        for depth in 1..10 {
            assert_eq!(row_prefix(depth).width(), indent_width(depth) as usize);
            assert!(row_prefix(depth).width() > row_prefix(depth - 1).width());
        }
    }

    #[test]
    fn test_build_rows() {
        let root = Node {
            id: "1".into(),
            name: "Root element".into(),
            children: vec![Arc::new(Node {
                id: "a".into(),
                name: "A".into(),
                children: vec![Arc::new(Node::leaf("b", "B"))],
            })],
        };
        let rows = build_rows(&root);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].parent, None);
        assert_eq!(rows[1].parent, Some(NodeId::new("1")));
        assert_eq!(rows[2].depth, 2);
        assert_eq!(rows[2].name, "B");
    }

    #[test]
    fn test_remove_affordance_only_below_root() {
        let root_row = Row {
            id: "1".into(),
            name: "Root element".into(),
            depth: 0,
            parent: None,
        };
        let child_row = Row {
            id: "a".into(),
            name: "A".into(),
            depth: 1,
            parent: Some("1".into()),
        };
        let text = |line: Line| -> String { line.spans.iter().map(|s| s.content.as_ref()).collect() };

        assert!(!text(row_line(&root_row, false, 30, 52)).contains("remove"));
        assert!(text(row_line(&child_row, false, 30, 52)).contains("[x] remove"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long name", 5), "a lo\u{2026}");
    }
}
