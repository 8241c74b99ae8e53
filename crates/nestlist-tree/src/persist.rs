use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, warn};

use crate::model::Node;
use crate::storage::{self, KvStore};

/// Command sent from the UI thread to the persistence thread.
#[derive(Debug)]
pub enum PersistCmd {
    /// Fetch the persisted tree.
    Load,
    /// Overwrite the persisted tree with this snapshot.
    Save(Arc<Node>),
}

/// Event received from the persistence thread.
#[derive(Debug)]
pub enum PersistEvent {
    /// Result of a `Load`. `None` when nothing was stored.
    Loaded(Option<Node>),
    /// The store could not be read; the caller starts from the default tree.
    LoadFailed(String),
    Saved,
    SaveFailed(String),
}

/// Sender/Receiver pair for communicating with the persistence thread.
///
/// Commands are handled one at a time in the order they were sent, so writes
/// reach the store in issue order and the last snapshot sent is the one that
/// sticks.
pub struct SaveWorker {
    sender: mpsc::Sender<PersistCmd>,
    receiver: mpsc::Receiver<PersistEvent>,
    handle: thread::JoinHandle<()>,
}

impl SaveWorker {
    /// Spawn the background persistence thread with a tokio runtime.
    pub fn spawn(store: Arc<dyn KvStore>) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PersistCmd>();
        let (event_tx, event_rx) = mpsc::channel::<PersistEvent>();

        let handle = thread::Builder::new()
            .name("nestlist-persist".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        error!(error = %err, "failed to create persistence runtime");
                        return;
                    }
                };

                rt.block_on(async move {
                    while let Ok(cmd) = cmd_rx.recv() {
                        let event = run_command(store.as_ref(), cmd).await;
                        // The UI may already be gone; keep draining queued saves.
                        let _ = event_tx.send(event);
                    }
                });
            })
            .context("Failed to spawn persistence thread")?;

        Ok(Self {
            sender: cmd_tx,
            receiver: event_rx,
            handle,
        })
    }

    /// Ask for the persisted tree; the answer arrives as `PersistEvent::Loaded`.
    pub fn request_load(&self) {
        if self.sender.send(PersistCmd::Load).is_err() {
            error!("persistence thread is gone, cannot load");
        }
    }

    /// Queue a snapshot for writing. Never blocks on the write itself.
    pub fn save(&self, root: Arc<Node>) {
        if self.sender.send(PersistCmd::Save(root)).is_err() {
            error!("persistence thread is gone, dropping save");
        }
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Option<PersistEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PersistEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Stop accepting commands and wait for queued ones to finish.
    pub fn finish(self) {
        let Self {
            sender,
            receiver,
            handle,
        } = self;
        drop(sender);
        drop(receiver);
        if handle.join().is_err() {
            error!("persistence thread panicked");
        }
    }
}

async fn run_command(store: &dyn KvStore, cmd: PersistCmd) -> PersistEvent {
    match cmd {
        PersistCmd::Load => match storage::load_tree(store).await {
            Ok(tree) => PersistEvent::Loaded(tree),
            Err(err) => {
                warn!(error = %err, "loading tree failed, starting from the default tree");
                PersistEvent::LoadFailed(err.to_string())
            }
        },
        PersistCmd::Save(root) => match storage::save_tree(store, &root).await {
            Ok(()) => PersistEvent::Saved,
            Err(err) => {
                error!(error = %err, "saving tree failed");
                PersistEvent::SaveFailed(err.to_string())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, default_root};
    use crate::storage::{MemoryKvStore, TREE_KEY, UnavailableKvStore};

    const WAIT: Duration = Duration::from_secs(5);

    fn tree_with(names: &[&str]) -> Arc<Node> {
        Arc::new(Node {
            id: "1".into(),
            name: "Root element".into(),
            children: names
                .iter()
                .enumerate()
                .map(|(i, n)| Arc::new(Node::leaf(format!("c{i}"), *n)))
                .collect(),
        })
    }

    #[test]
    fn test_load_from_empty_store() {
        let kv = Arc::new(MemoryKvStore::new());
        let worker = SaveWorker::spawn(kv.clone()).unwrap();
        worker.request_load();

        match worker.recv_timeout(WAIT) {
            Some(PersistEvent::Loaded(None)) => {}
            other => panic!("unexpected event: {other:?}"),
        }
        worker.finish();
        assert_eq!(kv.write_count(), 0);
    }

    #[test]
    fn test_unreadable_store_reports_load_failure() {
        let worker = SaveWorker::spawn(Arc::new(UnavailableKvStore::new("locked"))).unwrap();
        worker.request_load();

        match worker.recv_timeout(WAIT) {
            Some(PersistEvent::LoadFailed(msg)) => assert!(msg.contains("locked")),
            other => panic!("unexpected event: {other:?}"),
        }
        worker.finish();
    }

    #[test]
    fn test_last_issued_save_wins() {
        let kv = Arc::new(MemoryKvStore::new());
        let worker = SaveWorker::spawn(kv.clone()).unwrap();

        worker.save(tree_with(&["a"]));
        worker.save(tree_with(&["a", "b"]));
        worker.save(tree_with(&["b"]));
        worker.finish();

        assert_eq!(kv.write_count(), 3);
        let stored: Node = serde_json::from_value(kv.raw(TREE_KEY).unwrap()).unwrap();
        assert_eq!(stored, *tree_with(&["b"]));
    }

    #[test]
    fn test_save_then_load() {
        let kv = Arc::new(MemoryKvStore::new());
        let worker = SaveWorker::spawn(kv).unwrap();

        worker.save(tree_with(&["x", "y"]));
        worker.request_load();

        assert!(matches!(worker.recv_timeout(WAIT), Some(PersistEvent::Saved)));
        match worker.recv_timeout(WAIT) {
            Some(PersistEvent::Loaded(Some(tree))) => assert_eq!(tree, *tree_with(&["x", "y"])),
            other => panic!("unexpected event: {other:?}"),
        }
        worker.finish();
    }

    #[test]
    fn test_failed_save_is_reported() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.fail_next_writes(2);
        let worker = SaveWorker::spawn(kv.clone()).unwrap();

        worker.save(default_root());
        match worker.recv_timeout(WAIT) {
            Some(PersistEvent::SaveFailed(msg)) => assert!(msg.contains("write rejected")),
            other => panic!("unexpected event: {other:?}"),
        }

        // The next save goes through again.
        worker.save(default_root());
        assert!(matches!(worker.recv_timeout(WAIT), Some(PersistEvent::Saved)));
        worker.finish();
        assert_eq!(kv.write_count(), 1);
    }
}
