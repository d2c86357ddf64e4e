//! In-memory collaborators for reconciliation tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::counter::{NewItemCount, NewItemCounter};
use super::store::{ContentRefresh, ItemStore, ReadStateMutator};
use super::SyncError;
use crate::feed::{UpdateFlags, UpdateResult};
use crate::storage::{DatabaseError, Item, ItemKey, Subscription};

pub(crate) fn item(id: ItemKey, source_id: Option<&str>, read: bool) -> Item {
    Item {
        id,
        subscription_id: 1,
        guid: format!("guid-{id}"),
        source_id: source_id.map(str::to_string),
        title: Arc::from(format!("Item {id}")),
        read,
    }
}

/// Item store backed by a `Vec`, in sequence order, with call counting.
///
/// Doubles as the read-state mutator: each change is recorded and resets the
/// attached new-item counter, like the real one does when items become read.
pub(crate) struct MemoryStore {
    items: Mutex<Vec<Item>>,
    loads: AtomicUsize,
    sequences: AtomicUsize,
    changes: Mutex<Vec<(ItemKey, bool)>>,
    counter: NewItemCount,
}

impl MemoryStore {
    pub(crate) fn new(items: Vec<Item>) -> Self {
        Self::with_counter(items, NewItemCount::new())
    }

    pub(crate) fn with_counter(items: Vec<Item>, counter: NewItemCount) -> Self {
        Self {
            items: Mutex::new(items),
            loads: AtomicUsize::new(0),
            sequences: AtomicUsize::new(0),
            changes: Mutex::new(Vec::new()),
            counter,
        }
    }

    pub(crate) fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub(crate) fn sequence_count(&self) -> usize {
        self.sequences.load(Ordering::SeqCst)
    }

    pub(crate) fn changes(&self) -> Vec<(ItemKey, bool)> {
        self.changes.lock().unwrap().clone()
    }

    /// Drop an item from the store without going through `remove_item`.
    pub(crate) fn forget(&self, key: ItemKey) {
        self.items.lock().unwrap().retain(|i| i.id != key);
    }

    pub(crate) fn item(&self, key: ItemKey) -> Option<Item> {
        self.items.lock().unwrap().iter().find(|i| i.id == key).cloned()
    }
}

impl ItemStore for MemoryStore {
    async fn load_item(&self, key: ItemKey) -> Result<Option<Item>, DatabaseError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.item(key))
    }

    async fn item_sequence(&self, _subscription_id: i64) -> Result<Vec<ItemKey>, DatabaseError> {
        self.sequences.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.lock().unwrap().iter().map(|i| i.id).collect())
    }

    async fn remove_item(&self, key: ItemKey) -> Result<(), DatabaseError> {
        self.forget(key);
        Ok(())
    }
}

impl ReadStateMutator for MemoryStore {
    async fn set_read_state(&self, item: &Item, read: bool) -> Result<(), DatabaseError> {
        self.changes.lock().unwrap().push((item.id, read));
        if let Some(stored) = self.items.lock().unwrap().iter_mut().find(|i| i.id == item.id) {
            stored.read = read;
        }
        self.counter.set(0);
        Ok(())
    }
}

/// A refresh step that wipes all subscription metadata and adds new items
/// to the counter, standing in for the generic feed refresh.
pub(crate) struct ClearingRefresh {
    pub(crate) counter: NewItemCount,
    pub(crate) new_items: usize,
}

impl ContentRefresh for ClearingRefresh {
    async fn process(
        &self,
        subscription: &mut Subscription,
        _result: &UpdateResult,
        _flags: UpdateFlags,
    ) -> Result<usize, SyncError> {
        subscription.metadata.clear();
        self.counter.add(self.new_items as u64);
        Ok(self.new_items)
    }
}

/// Collects formatted log output so tests can assert on emitted events.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Subscriber writing plain-text events at debug level and above into
    /// this buffer. Install it with `tracing::subscriber::set_default`.
    pub(crate) fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    pub(crate) fn lines_containing(&self, needle: &str) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
