use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ── Constants ────────────────────────────────────────────────────────

/// Id of the root of a fresh tree.
pub const ROOT_ID: &str = "1";
/// Display name of the root of a fresh tree.
pub const ROOT_NAME: &str = "Root element";

const ID_LEN: usize = 9;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ── Data models ──────────────────────────────────────────────────────

/// Identifier of a node, unique across the whole tree and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A node of the nested list.
///
/// Nodes are immutable once built: a mutation produces a new tree that
/// re-allocates only the nodes on the path from the root to the change, and
/// shares every other branch with the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Arc<Node>>,
}

impl Node {
    /// A node without children.
    pub fn leaf(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// The tree used when nothing has been persisted yet.
pub fn default_root() -> Arc<Node> {
    Arc::new(Node::leaf(ROOT_ID, ROOT_NAME))
}

// ── Lookup ───────────────────────────────────────────────────────────

/// Depth-first pre-order search; returns the first node with `id`.
pub fn find_by_id<'a>(subtree: &'a Node, id: &NodeId) -> Option<&'a Node> {
    if subtree.id == *id {
        return Some(subtree);
    }
    for child in &subtree.children {
        if let Some(found) = find_by_id(child, id) {
            return Some(found);
        }
    }
    None
}

/// Find the node whose children include `id`.
pub fn find_parent<'a>(subtree: &'a Node, id: &NodeId) -> Option<&'a Node> {
    for child in &subtree.children {
        if child.id == *id {
            return Some(subtree);
        }
        if let Some(found) = find_parent(child, id) {
            return Some(found);
        }
    }
    None
}

/// Child indices leading from `root` to the node with `id`.
fn path_to(root: &Node, id: &NodeId) -> Option<Vec<usize>> {
    fn walk(node: &Node, id: &NodeId, path: &mut Vec<usize>) -> bool {
        if node.id == *id {
            return true;
        }
        for (i, child) in node.children.iter().enumerate() {
            path.push(i);
            if walk(child, id, path) {
                return true;
            }
            path.pop();
        }
        false
    }
    let mut path = Vec::new();
    walk(root, id, &mut path).then_some(path)
}

// ── Mutation ─────────────────────────────────────────────────────────

/// Copy the nodes along `path`, applying `edit` to the children of the last one.
fn rebuild_along<F>(node: &Node, path: &[usize], edit: F) -> Arc<Node>
where
    F: FnOnce(&mut Vec<Arc<Node>>),
{
    let mut children = node.children.clone();
    match path.split_first() {
        None => edit(&mut children),
        Some((&idx, rest)) => children[idx] = rebuild_along(&node.children[idx], rest, edit),
    }
    Arc::new(Node {
        id: node.id.clone(),
        name: node.name.clone(),
        children,
    })
}

/// Append `child` to the children of `parent_id`.
/// Returns the new root, or `None` if `parent_id` is not in the tree.
pub fn with_child_appended(root: &Node, parent_id: &NodeId, child: Node) -> Option<Arc<Node>> {
    let path = path_to(root, parent_id)?;
    Some(rebuild_along(root, &path, |children| {
        children.push(Arc::new(child))
    }))
}

/// Remove `child_id` (and its whole subtree) from the children of `parent_id`.
/// Returns the new root, or `None` if there was nothing to remove.
pub fn without_child(root: &Node, parent_id: &NodeId, child_id: &NodeId) -> Option<Arc<Node>> {
    let path = path_to(root, parent_id)?;
    let parent = node_at(root, &path);
    if !parent.children.iter().any(|c| c.id == *child_id) {
        return None;
    }
    Some(rebuild_along(root, &path, |children| {
        children.retain(|c| c.id != *child_id)
    }))
}

fn node_at<'a>(root: &'a Node, path: &[usize]) -> &'a Node {
    path.iter().fold(root, |node, &idx| &node.children[idx])
}

// ── Id generation ────────────────────────────────────────────────────

/// Generate a random base-36 id that does not already occur in `root`.
pub fn generate_id<R: Rng + ?Sized>(root: &Node, rng: &mut R) -> NodeId {
    loop {
        let candidate: String = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        let candidate = NodeId(candidate);
        if find_by_id(root, &candidate).is_none() {
            return candidate;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// root
    /// ├── a
    /// │   ├── a1
    /// │   └── a2
    /// └── b
    fn sample() -> Arc<Node> {
        let a = Node {
            id: "a".into(),
            name: "A".into(),
            children: vec![
                Arc::new(Node::leaf("a1", "A1")),
                Arc::new(Node::leaf("a2", "A2")),
            ],
        };
        Arc::new(Node {
            id: ROOT_ID.into(),
            name: ROOT_NAME.into(),
            children: vec![Arc::new(a), Arc::new(Node::leaf("b", "B"))],
        })
    }

    #[test]
    fn test_default_root() {
        let root = default_root();
        assert_eq!(root.id.as_str(), "1");
        assert_eq!(root.name, "Root element");
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_find_by_id() {
        let root = sample();
        assert_eq!(find_by_id(&root, &"a2".into()).unwrap().name, "A2");
        assert_eq!(find_by_id(&root, &"1".into()).unwrap().name, ROOT_NAME);
        assert!(find_by_id(&root, &"zzz".into()).is_none());
    }

    #[test]
    fn test_find_parent() {
        let root = sample();
        assert_eq!(find_parent(&root, &"a1".into()).unwrap().id.as_str(), "a");
        assert_eq!(find_parent(&root, &"b".into()).unwrap().id.as_str(), "1");
        assert!(find_parent(&root, &"1".into()).is_none());
    }

    #[test]
    fn test_append_shares_untouched_branches() {
        let root = sample();
        let new_root = with_child_appended(&root, &"a".into(), Node::leaf("a3", "A3")).unwrap();

        assert!(!Arc::ptr_eq(&root, &new_root));
        // "b" was not on the path and is shared
        assert!(Arc::ptr_eq(&root.children[1], &new_root.children[1]));
        // "a1" is shared even though its parent was copied
        assert!(Arc::ptr_eq(
            &root.children[0].children[0],
            &new_root.children[0].children[0]
        ));

        let a = find_by_id(&new_root, &"a".into()).unwrap();
        let names: Vec<&str> = a.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A1", "A2", "A3"]);

        // The old snapshot is untouched
        assert_eq!(find_by_id(&root, &"a".into()).unwrap().child_count(), 2);
    }

    #[test]
    fn test_append_to_missing_parent() {
        let root = sample();
        assert!(with_child_appended(&root, &"ghost".into(), Node::leaf("x", "X")).is_none());
    }

    #[test]
    fn test_remove_subtree_keeps_sibling_order() {
        let root = sample();
        let new_root = without_child(&root, &"1".into(), &"a".into()).unwrap();
        assert_eq!(new_root.child_count(), 1);
        assert_eq!(new_root.children[0].id.as_str(), "b");
        assert!(find_by_id(&new_root, &"a1".into()).is_none());
        assert_eq!(new_root.node_count(), 2);

        let new_root = without_child(&root, &"a".into(), &"a1".into()).unwrap();
        let a = find_by_id(&new_root, &"a".into()).unwrap();
        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].id.as_str(), "a2");
    }

    #[test]
    fn test_remove_absent_child_is_noop() {
        let root = sample();
        assert!(without_child(&root, &"a".into(), &"b".into()).is_none());
        assert!(without_child(&root, &"ghost".into(), &"a".into()).is_none());
    }

    #[test]
    fn test_node_count() {
        assert_eq!(sample().node_count(), 5);
        assert_eq!(default_root().node_count(), 1);
    }

    #[test]
    fn test_generated_ids_are_base36_and_fresh() {
        let mut rng = StdRng::seed_from_u64(7);
        let root = sample();
        let id = generate_id(&root, &mut rng);
        assert_eq!(id.as_str().len(), 9);
        assert!(
            id.as_str()
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
        );
        assert!(find_by_id(&root, &id).is_none());
    }

    #[test]
    fn test_json_shape() {
        let root = sample();
        let value = serde_json::to_value(&*root).unwrap();
        assert_eq!(value["id"], "1");
        assert_eq!(value["name"], "Root element");
        assert_eq!(value["children"][0]["children"][1]["id"], "a2");

        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, *root);
    }

    #[test]
    fn test_missing_children_field_defaults_to_empty() {
        let node: Node = serde_json::from_str(r#"{"id":"1","name":"Root element"}"#).unwrap();
        assert!(node.children.is_empty());
    }
}
