use crate::model::Node;

/// Horizontal cells per depth level.
pub const INDENT_STEP: u16 = 4;
/// Offset of the connector glyph inside its level's indentation.
pub const CONNECTOR_INSET: u16 = 1;

/// One step of a pre-order walk.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub node: &'a Node,
    pub depth: usize,
    /// `None` only for the root.
    pub parent: Option<&'a Node>,
}

/// Lazy pre-order traversal of a tree. Cloning it restarts from the same point.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    stack: Vec<Visit<'a>>,
}

/// Walk `root` in pre-order, yielding each node with its depth and parent.
pub fn walk(root: &Node) -> Walk<'_> {
    Walk {
        stack: vec![Visit {
            node: root,
            depth: 0,
            parent: None,
        }],
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let visit = self.stack.pop()?;
        // Reverse so the first child is popped next.
        for child in visit.node.children.iter().rev() {
            self.stack.push(Visit {
                node: child,
                depth: visit.depth + 1,
                parent: Some(visit.node),
            });
        }
        Some(visit)
    }
}

/// Leading cells before a node's name at `depth`.
pub fn indent_width(depth: usize) -> u16 {
    u16::try_from(depth)
        .unwrap_or(u16::MAX)
        .saturating_mul(INDENT_STEP)
}

/// Column of the `└─` connector for a node at `depth`; the root has none.
pub fn connector_offset(depth: usize) -> Option<u16> {
    if depth == 0 {
        return None;
    }
    Some(indent_width(depth - 1).saturating_add(CONNECTOR_INSET))
}
