pub mod model;
pub mod persist;
pub mod storage;
pub mod store;
pub mod ui;
pub mod walk;

use nestlist_core::dialog::{Dialog, DialogOutcome};
use nestlist_core::keybinds::{Action, InputMode, KeyState, process_normal_key};

use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};
use std::sync::Arc;
use tracing::info;

use model::Node;
use persist::{PersistEvent, SaveWorker};
use store::{DialogState, TreeStore};
use ui::Row;

/// Lines moved by Ctrl-d / Ctrl-u.
const HALF_PAGE: usize = 10;

/// The nested list view: tree store, dialogs and persistence wired to keys.
pub struct NestedListTool {
    store: TreeStore,
    worker: SaveWorker,
    /// Flattened rows of the current tree.
    rows: Vec<Row>,
    /// Currently selected index into `rows`.
    selected: usize,
    /// The open dialog widget, mirroring `store.dialog()`.
    dialog: Option<Dialog>,
    mode: InputMode,
    key_state: KeyState,
    /// Last persistence failure, cleared by the next successful save.
    last_error: Option<String>,
}

impl NestedListTool {
    /// Create the view and ask `worker` for the persisted tree.
    pub fn new(worker: SaveWorker) -> Self {
        Self::with_store(TreeStore::new(), worker)
    }

    pub fn with_store(store: TreeStore, worker: SaveWorker) -> Self {
        worker.request_load();
        Self {
            store,
            worker,
            rows: Vec::new(),
            selected: 0,
            dialog: None,
            mode: InputMode::Normal,
            key_state: KeyState::default(),
            last_error: None,
        }
    }

    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected)
    }

    /// Short status line text.
    pub fn status_info(&self) -> String {
        match self.store.root() {
            None => "loading".to_string(),
            Some(root) => format!(
                "{} nodes  a:add  d:remove  j/k:move  q:quit",
                root.node_count()
            ),
        }
    }

    /// Drain events from the persistence thread.
    pub fn tick(&mut self) {
        while let Some(event) = self.worker.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: PersistEvent) {
        match event {
            PersistEvent::Loaded(tree) => self.install_loaded(tree),
            PersistEvent::LoadFailed(msg) => {
                self.last_error = Some(format!("load failed: {msg}"));
                self.install_loaded(None);
            }
            PersistEvent::Saved => self.last_error = None,
            PersistEvent::SaveFailed(msg) => {
                self.last_error = Some(format!("save failed: {msg}"));
            }
        }
    }

    /// Only the first load is applied; it never triggers a save.
    fn install_loaded(&mut self, tree: Option<Node>) {
        if !self.store.is_loaded() {
            self.store.apply_loaded(tree);
            self.rebuild_rows();
        }
    }

    /// Stop the persistence thread once queued saves are written.
    pub fn finish(self) {
        info!("shutting down, flushing pending saves");
        self.worker.finish();
    }

    // ── Rows and selection ───────────────────────────────────────────

    /// Rebuild rows from the current tree, keeping the selection on the same id.
    fn rebuild_rows(&mut self) {
        let old_id = self.selected_row().map(|r| r.id.clone());
        self.rows = self.store.root().map(ui::build_rows).unwrap_or_default();

        if let Some(id) = old_id {
            if let Some(pos) = self.rows.iter().position(|r| r.id == id) {
                self.selected = pos;
                return;
            }
        }
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    fn move_down(&mut self, n: usize) {
        let last = self.rows.len().saturating_sub(1);
        self.selected = (self.selected + n).min(last);
    }

    fn move_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    // ── Mutations ────────────────────────────────────────────────────

    fn commit(&mut self, snapshot: Option<Arc<Node>>) {
        if let Some(root) = snapshot {
            self.worker.save(root);
            self.rebuild_rows();
        }
    }

    fn open_add_dialog(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let id = row.id.clone();
        if self.store.begin_add(&id) {
            self.dialog = Some(Dialog::prompt("Add new item"));
            self.mode = InputMode::Insert;
        }
    }

    fn open_delete_dialog(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let Some(parent) = row.parent.clone() else {
            return; // the root has no remove action
        };
        let id = row.id.clone();
        if self.store.begin_delete(&parent, &id) {
            let name = match self.store.dialog() {
                DialogState::ConfirmingDelete { node_name, .. } => node_name.clone(),
                _ => String::new(),
            };
            self.dialog = Some(Dialog::confirm(
                "Delete Item",
                vec![
                    format!("Are you sure you want to delete \"{name}\"?"),
                    "This action cannot be undone.".to_string(),
                ],
            ));
            self.mode = InputMode::Confirm;
        }
    }

    fn close_dialog(&mut self) {
        self.dialog = None;
        self.mode = InputMode::Normal;
    }

    // ── Key handling ─────────────────────────────────────────────────

    /// Handle a key event. Returns `Action::Quit` when the user asks to leave.
    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if let Some(dialog) = self.dialog.as_mut() {
            match dialog.handle_key(key) {
                DialogOutcome::Pending => {}
                DialogOutcome::Submitted(name) => {
                    let snapshot = self.store.confirm_add(&name);
                    self.close_dialog();
                    self.commit(snapshot);
                }
                DialogOutcome::Confirmed => {
                    let snapshot = self.store.confirm_delete();
                    self.close_dialog();
                    self.commit(snapshot);
                }
                DialogOutcome::Cancelled => {
                    self.store.cancel_dialog();
                    self.close_dialog();
                }
            }
            return Action::None;
        }

        let action = process_normal_key(key, &mut self.key_state);
        if !self.store.is_loaded() {
            return match action {
                Action::Quit => Action::Quit,
                _ => Action::None,
            };
        }

        match action {
            Action::MoveDown(n) => self.move_down(n),
            Action::MoveUp(n) => self.move_up(n),
            Action::GotoTop => self.selected = 0,
            Action::GotoBottom => self.selected = self.rows.len().saturating_sub(1),
            Action::HalfPageDown => self.move_down(HALF_PAGE),
            Action::HalfPageUp => self.move_up(HALF_PAGE),
            Action::Add => self.open_add_dialog(),
            Action::Delete => self.open_delete_dialog(),
            Action::Quit => return Action::Quit,
            Action::None => {}
        }
        Action::None
    }

    /// Render the view and any open dialog into `area`.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        ui::render_tree_view(frame, area, &self.rows, self.selected, self.store.is_loaded());
        if let Some(dialog) = &self.dialog {
            dialog.render(frame, area);
        }
    }
}
