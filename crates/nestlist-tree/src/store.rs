use crate::model::{self, Node, NodeId};
use crate::storage::{self, KvStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which dialog is open, and what it targets.
///
/// Targets are held by id and re-resolved against the current tree when the
/// dialog is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogState {
    #[default]
    Closed,
    AddingTo {
        target: NodeId,
        target_name: String,
    },
    ConfirmingDelete {
        parent: NodeId,
        node: NodeId,
        node_name: String,
    },
}

/// Owns the current tree snapshot and the pending dialog.
///
/// Mutating operations return the new snapshot when the tree changed; the
/// caller hands it to persistence. Loading never produces one.
pub struct TreeStore {
    root: Option<Arc<Node>>,
    dialog: DialogState,
    rng: StdRng,
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStore {
    pub fn new() -> Self {
        Self {
            root: None,
            dialog: DialogState::Closed,
            rng: StdRng::from_entropy(),
        }
    }

    /// A store whose id generator is seeded, for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.root.is_some()
    }

    /// The current tree, or `None` before loading finished.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    pub fn snapshot(&self) -> Option<Arc<Node>> {
        self.root.clone()
    }

    pub fn dialog(&self) -> &DialogState {
        &self.dialog
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Fetch the persisted tree from `store`, falling back to the default tree.
    pub async fn load(&mut self, store: &dyn KvStore) {
        let loaded = match storage::load_tree(store).await {
            Ok(tree) => tree,
            Err(err) => {
                warn!(error = %err, "loading tree failed, starting from the default tree");
                None
            }
        };
        self.apply_loaded(loaded);
    }

    /// Install the result of a load that ran elsewhere.
    pub fn apply_loaded(&mut self, loaded: Option<Node>) {
        let root = match loaded {
            Some(tree) => Arc::new(tree),
            None => model::default_root(),
        };
        info!(nodes = root.node_count(), "tree loaded");
        self.root = Some(root);
    }

    // ── Add flow ─────────────────────────────────────────────────────

    /// Open the add dialog for `target`. Returns false if it is not in the tree.
    pub fn begin_add(&mut self, target: &NodeId) -> bool {
        let Some(node) = self.root().and_then(|root| model::find_by_id(root, target)) else {
            return false;
        };
        self.dialog = DialogState::AddingTo {
            target: target.clone(),
            target_name: node.name.clone(),
        };
        true
    }

    /// Append a child named `name`, kept exactly as typed, to the add target
    /// and close the dialog.
    ///
    /// A blank name, or a target that no longer exists, closes the dialog
    /// without changing the tree.
    pub fn confirm_add(&mut self, name: &str) -> Option<Arc<Node>> {
        let target = match &self.dialog {
            DialogState::AddingTo { target, .. } => target.clone(),
            _ => return None,
        };
        self.dialog = DialogState::Closed;

        if name.trim().is_empty() {
            debug!("empty name, nothing added");
            return None;
        }

        let root = self.root.as_ref()?;
        let id = model::generate_id(root, &mut self.rng);
        let Some(new_root) = model::with_child_appended(root, &target, Node::leaf(id.clone(), name))
        else {
            debug!(target = %target, "add target no longer exists");
            return None;
        };

        debug!(parent = %target, id = %id, "child added");
        self.root = Some(Arc::clone(&new_root));
        Some(new_root)
    }

    // ── Delete flow ──────────────────────────────────────────────────

    /// Open the delete confirmation for `node` under `parent`.
    /// The root has no parent and can never be targeted.
    pub fn begin_delete(&mut self, parent: &NodeId, node: &NodeId) -> bool {
        let Some(root) = self.root() else {
            return false;
        };
        let Some(actual_parent) = model::find_parent(root, node) else {
            return false;
        };
        if actual_parent.id != *parent {
            return false;
        }
        let Some(target) = model::find_by_id(actual_parent, node) else {
            return false;
        };
        self.dialog = DialogState::ConfirmingDelete {
            parent: parent.clone(),
            node: node.clone(),
            node_name: target.name.clone(),
        };
        true
    }

    /// Remove the delete target and its subtree, then close the dialog.
    /// Removing a node that is already gone changes nothing.
    pub fn confirm_delete(&mut self) -> Option<Arc<Node>> {
        let (parent, node) = match &self.dialog {
            DialogState::ConfirmingDelete { parent, node, .. } => (parent.clone(), node.clone()),
            _ => return None,
        };
        self.dialog = DialogState::Closed;

        let root = self.root.as_ref()?;
        let Some(new_root) = model::without_child(root, &parent, &node) else {
            debug!(node = %node, "delete target already gone");
            return None;
        };

        debug!(parent = %parent, node = %node, "subtree removed");
        self.root = Some(Arc::clone(&new_root));
        Some(new_root)
    }

    /// Close any dialog without touching the tree.
    pub fn cancel_dialog(&mut self) {
        self.dialog = DialogState::Closed;
    }
}

// ── Tests ────────────────────────────────────────────────────────────
